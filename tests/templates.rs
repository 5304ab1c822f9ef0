// 解析并运行 templates/ 下的每个示例脚本
use std::fs;
use std::path::{Path, PathBuf};

use terragen::script::{parse_script, script_to_text};
use terragen::{AgentRegistry, Generator, GeneratorConfig, SEA_LEVEL};

fn template_files() -> Vec<PathBuf> {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("templates");
    let mut files: Vec<PathBuf> = fs::read_dir(&dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "agents"))
        .collect();
    files.sort();
    files
}

#[test]
fn test_templates_exist() {
    assert!(template_files().len() >= 2);
}

#[test]
fn test_every_template_line_is_recognized() {
    let registry = AgentRegistry::default();
    for path in template_files() {
        let text = fs::read_to_string(&path).unwrap();
        let phases = parse_script(&text, &registry);
        let lines = text
            .lines()
            .filter(|l| !l.trim().is_empty() && l.trim() != "newPhase")
            .count();
        let templates: usize = phases.iter().map(Vec::len).sum();
        assert_eq!(templates, lines, "{} has unrecognized lines", path.display());
        assert!(phases.iter().all(|p| !p.is_empty()), "{} has an empty phase", path.display());

        let normalized = script_to_text(&phases);
        assert_eq!(script_to_text(&parse_script(&normalized, &registry)), normalized);
    }
}

#[test]
fn test_every_template_builds_land() {
    for path in template_files() {
        let config = GeneratorConfig::with_size(48).with_seed(11);
        let mut generator = Generator::from_config(&config).unwrap();
        generator.load(&path).unwrap();
        generator.run_all();

        assert!(generator.is_over(), "{} did not finish", path.display());
        let land = generator
            .height_map()
            .heights()
            .iter()
            .filter(|&&h| h >= SEA_LEVEL)
            .count();
        assert!(land > 0, "{} produced no land", path.display());
    }
}
