// Agent 脚本编解码
//
// 行格式：
// ```
// CoastLine!count=1!life=400
// Smooth!count=4
// newPhase
// River!count=3!depth=6
// ```
// `newPhase` 开始一个新阶段（第一个阶段隐含在文件开头）；其他非空行是以 `!`
// 分隔的字段，字段 0 为类型标签，其余为 `名称=数值`，空字段被跳过。

use crate::agents::{Agent, AgentRegistry};
use crate::error::{GeneratorError, ScriptError};
use log::{debug, info, warn};
use std::path::Path;

/// 阶段分隔行
pub const NEW_PHASE: &str = "newPhase";

/// 字段分隔符
pub const FIELD_SEPARATOR: char = '!';

/// 名称与数值的分隔符
pub const VALUE_SEPARATOR: char = '=';

/// 按阶段分组的 agent 模板
pub type Phases = Vec<Vec<Box<dyn Agent>>>;

/// 拆分字段，跳过空字段
fn split_fields(line: &str) -> Vec<&str> {
    line.split(FIELD_SEPARATOR)
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .collect()
}

/// 解析 `名称=数值`
fn parse_field(field: &str, line_num: usize) -> Result<(&str, f32), ScriptError> {
    let (name, value) = field.split_once(VALUE_SEPARATOR).ok_or_else(|| {
        ScriptError::new(line_num, format!("expected name=value, got '{}'", field))
    })?;
    let name = name.trim();
    if name.is_empty() {
        return Err(ScriptError::new(
            line_num,
            format!("missing property name in '{}'", field),
        ));
    }
    let value: f32 = value
        .trim()
        .parse()
        .map_err(|_| ScriptError::new(line_num, format!("invalid number in '{}'", field)))?;
    if !value.is_finite() {
        return Err(ScriptError::new(
            line_num,
            format!("non-finite value in '{}'", field),
        ));
    }
    Ok((name, value))
}

/// 将 agent 编码为一行脚本（不含换行）
pub fn encode_agent<A: Agent + ?Sized>(agent: &A) -> String {
    let mut line = agent.type_name().to_string();
    for (name, value) in agent.properties().iter() {
        line.push(FIELD_SEPARATOR);
        line.push_str(&format!("{}{}{}", name, VALUE_SEPARATOR, value));
    }
    line
}

/// 将一行脚本的参数写入 agent
///
/// 类型标签必须与 agent 一致。整行先全部解析，出错时 agent 保持不变。
/// 未知的参数名会被忽略。
pub fn apply_line<A: Agent + ?Sized>(
    agent: &mut A,
    line: &str,
    line_num: usize,
) -> Result<(), ScriptError> {
    let fields = split_fields(line);
    let Some((&tag, rest)) = fields.split_first() else {
        return Err(ScriptError::new(line_num, "empty agent line"));
    };
    if tag != agent.type_name() {
        return Err(ScriptError::new(
            line_num,
            format!("type tag '{}' does not match {}", tag, agent.type_name()),
        ));
    }

    let values = rest
        .iter()
        .map(|field| parse_field(field, line_num))
        .collect::<Result<Vec<_>, _>>()?;

    for (name, value) in values {
        if !agent.set_value(name, value) {
            debug!(
                "line {}: {} has no property '{}', ignored",
                line_num,
                agent.type_name(),
                name
            );
        }
    }
    Ok(())
}

/// 解码一行脚本
///
/// 返回 `Ok(None)` 表示类型标签无法识别（该行被丢弃）。
pub fn decode_agent(
    line: &str,
    line_num: usize,
    registry: &AgentRegistry,
) -> Result<Option<Box<dyn Agent>>, ScriptError> {
    let fields = split_fields(line);
    let Some(tag) = fields.first() else {
        return Ok(None);
    };
    let Some(mut agent) = registry.create(tag) else {
        return Ok(None);
    };
    apply_line(agent.as_mut(), line, line_num)?;
    Ok(Some(agent))
}

/// 解析整个脚本
///
/// 无法识别的行被静默丢弃，格式错误的行记录警告后跳过，其余内容照常加载。
pub fn parse_script(text: &str, registry: &AgentRegistry) -> Phases {
    let mut phases: Phases = vec![Vec::new()];

    for (i, raw) in text.lines().enumerate() {
        let line_num = i + 1;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if line == NEW_PHASE {
            phases.push(Vec::new());
            continue;
        }

        match decode_agent(line, line_num, registry) {
            Ok(Some(agent)) => {
                if let Some(phase) = phases.last_mut() {
                    phase.push(agent);
                }
            }
            Ok(None) => debug!("line {}: unrecognized agent '{}', dropped", line_num, line),
            Err(e) => warn!("skipping malformed agent line: {}", e),
        }
    }

    phases
}

/// 将阶段编码为脚本文本
///
/// 阶段之间输出 `newPhase`（第一个阶段前不输出），每个模板一行。
pub fn script_to_text(phases: &[Vec<Box<dyn Agent>>]) -> String {
    let mut text = String::new();
    for (i, phase) in phases.iter().enumerate() {
        if i != 0 {
            text.push_str(NEW_PHASE);
            text.push('\n');
        }
        for agent in phase {
            text.push_str(&agent.to_line());
            text.push('\n');
        }
    }
    text
}

/// 从文件加载脚本
pub fn load_script_file(path: &Path, registry: &AgentRegistry) -> Result<Phases, GeneratorError> {
    let content = std::fs::read_to_string(path).map_err(|source| GeneratorError::Load {
        path: path.to_path_buf(),
        source,
    })?;
    let phases = parse_script(&content, registry);
    info!(
        "loaded {} ({} phases, {} templates)",
        path.display(),
        phases.len(),
        phases.iter().map(Vec::len).sum::<usize>()
    );
    Ok(phases)
}

/// 将脚本保存到文件
pub fn save_script_file(path: &Path, phases: &[Vec<Box<dyn Agent>>]) -> Result<(), GeneratorError> {
    std::fs::write(path, script_to_text(phases)).map_err(|source| GeneratorError::Save {
        path: path.to_path_buf(),
        source,
    })?;
    info!("saved script to {}", path.display());
    Ok(())
}
