//! Incremental build behaviour of `ScriptTool::run`.

use std::sync::Arc;

use cake_lib::engine::EngineConfig;
use cake_lib::script::{Script, ScriptRegistry, ScriptTool};
use cake_lib::target::Source;
use cake_lib::variant::Variant;
use serde_json::json;

use super::common::{Counter, TestProject};

/// `build.cake` copies `in.txt` to `out/copy.txt` with `mode` as its build
/// argument. The action fails after counting when `fail` is set.
fn copy_project(project: &TestProject, runs: &Counter, mode: &str, fail: bool) -> Arc<ScriptRegistry> {
  let runs = runs.clone();
  let mode = mode.to_string();
  let registry = ScriptRegistry::new()
    .with(project.path("config.cake"), |_| Ok(()))
    .with(project.path("build.cake"), move |cx: &Script| {
      let tool = ScriptTool::new(cx.configuration().clone());
      let from = cx.configuration().abspath("in.txt");
      let to = cx.configuration().abspath("out/copy.txt");
      let runs = runs.clone();
      let func = move || -> anyhow::Result<()> {
        runs.bump();
        if fail {
          anyhow::bail!("copy failed on purpose");
        }
        std::fs::create_dir_all(to.parent().unwrap())?;
        std::fs::copy(&from, &to)?;
        Ok(())
      };
      tool.run(
        cx,
        func,
        json!({ "mode": mode }),
        Some(vec!["out/copy.txt".to_string()]),
        &[Source::from("in.txt")],
      )?;
      Ok(())
    });
  Arc::new(registry)
}

#[tokio::test(flavor = "multi_thread")]
async fn warm_build_skips_the_action() {
  let project = TestProject::new();
  project.write_file("in.txt", "one");
  let runs = Counter::default();

  project.build(copy_project(&project, &runs, "plain", false), "build.cake").await.unwrap();
  assert_eq!(runs.get(), 1);
  assert_eq!(project.read_file("out/copy.txt"), "one");

  project.build(copy_project(&project, &runs, "plain", false), "build.cake").await.unwrap();
  assert_eq!(runs.get(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn changed_source_rebuilds() {
  let project = TestProject::new();
  project.write_file("in.txt", "one");
  let runs = Counter::default();

  project.build(copy_project(&project, &runs, "plain", false), "build.cake").await.unwrap();
  project.write_file("in.txt", "two");
  project.build(copy_project(&project, &runs, "plain", false), "build.cake").await.unwrap();

  assert_eq!(runs.get(), 2);
  assert_eq!(project.read_file("out/copy.txt"), "two");
}

#[tokio::test(flavor = "multi_thread")]
async fn changed_args_rebuild() {
  let project = TestProject::new();
  project.write_file("in.txt", "one");
  let runs = Counter::default();

  project.build(copy_project(&project, &runs, "plain", false), "build.cake").await.unwrap();
  project.build(copy_project(&project, &runs, "fancy", false), "build.cake").await.unwrap();
  assert_eq!(runs.get(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_target_rebuilds() {
  let project = TestProject::new();
  project.write_file("in.txt", "one");
  let runs = Counter::default();

  project.build(copy_project(&project, &runs, "plain", false), "build.cake").await.unwrap();
  std::fs::remove_file(project.path("out/copy.txt")).unwrap();
  project.build(copy_project(&project, &runs, "plain", false), "build.cake").await.unwrap();

  assert_eq!(runs.get(), 2);
  assert!(project.exists("out/copy.txt"));
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_action_does_not_record() {
  let project = TestProject::new();
  project.write_file("in.txt", "one");
  let runs = Counter::default();

  let err = project
    .build(copy_project(&project, &runs, "plain", true), "build.cake")
    .await
    .unwrap_err();
  assert!(err.to_string().contains("copy failed on purpose"), "unexpected error: {}", err);
  assert!(!project.exists(".cake/deps") || std::fs::read_dir(project.path(".cake/deps")).unwrap().count() == 0);

  project.build(copy_project(&project, &runs, "plain", false), "build.cake").await.unwrap();
  project.build(copy_project(&project, &runs, "plain", false), "build.cake").await.unwrap();
  assert_eq!(runs.get(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_rebuild_keeps_the_old_record() {
  let project = TestProject::new();
  project.write_file("in.txt", "one");
  let runs = Counter::default();

  project.build(copy_project(&project, &runs, "plain", false), "build.cake").await.unwrap();
  project.write_file("in.txt", "two");
  assert!(
    project
      .build(copy_project(&project, &runs, "plain", true), "build.cake")
      .await
      .is_err()
  );
  project.build(copy_project(&project, &runs, "plain", false), "build.cake").await.unwrap();

  assert_eq!(runs.get(), 3);
  assert_eq!(project.read_file("out/copy.txt"), "two");
}

#[tokio::test(flavor = "multi_thread")]
async fn forced_build_ignores_records() {
  let project = TestProject::new();
  project.write_file("in.txt", "one");
  let runs = Counter::default();

  project.build(copy_project(&project, &runs, "plain", false), "build.cake").await.unwrap();
  let config = EngineConfig {
    force: true,
    ..EngineConfig::default()
  };
  project
    .build_with(copy_project(&project, &runs, "plain", false), config, "build.cake", &Variant::new())
    .await
    .unwrap();
  assert_eq!(runs.get(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn records_live_in_the_dependency_dir() {
  let project = TestProject::new();
  project.write_file("in.txt", "one");
  let runs = Counter::default();

  let script = project
    .build(copy_project(&project, &runs, "plain", false), "build.cake")
    .await
    .unwrap();
  let store = script.configuration().dependency_store();
  assert_eq!(store.dir(), project.path(".cake/deps"));

  let target = project.path("out/copy.txt");
  let record = store.load(&target.to_string_lossy()).unwrap();
  assert_eq!(record.targets, vec![target.to_string_lossy().into_owned()]);

  assert_eq!(script.configuration().clear_dependency_info().unwrap(), 1);
  project.build(copy_project(&project, &runs, "plain", false), "build.cake").await.unwrap();
  assert_eq!(runs.get(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn actions_wait_for_their_sources() {
  let project = TestProject::new();
  let registry = ScriptRegistry::new()
    .with(project.path("config.cake"), |_| Ok(()))
    .with(project.path("build.cake"), |cx: &Script| {
      let tool = ScriptTool::new(cx.configuration().clone());
      let generated = cx.configuration().abspath("gen.txt");
      let first = move || -> anyhow::Result<()> {
        std::thread::sleep(std::time::Duration::from_millis(50));
        std::fs::write(&generated, "generated")?;
        Ok(())
      };
      let produced = tool
        .run(cx, first, json!("generate"), Some(vec!["gen.txt".to_string()]), &[])?
        .into_targets();

      let (from, to) = (cx.configuration().abspath("gen.txt"), cx.configuration().abspath("final.txt"));
      let second = move || -> anyhow::Result<()> {
        std::fs::copy(&from, &to)?;
        Ok(())
      };
      let sources: Vec<Source> = produced.into_iter().map(Source::from).collect();
      tool.run(cx, second, json!("copy"), Some(vec!["final.txt".to_string()]), &sources)?;
      Ok(())
    });

  project.build(Arc::new(registry), "build.cake").await.unwrap();
  assert_eq!(project.read_file("final.txt"), "generated");
}

#[tokio::test(flavor = "multi_thread")]
async fn actions_without_targets_always_run() {
  let project = TestProject::new();
  let runs = Counter::default();
  let counter = runs.clone();
  let registry = Arc::new(
    ScriptRegistry::new()
      .with(project.path("config.cake"), |_| Ok(()))
      .with(project.path("build.cake"), move |cx: &Script| {
        let tool = ScriptTool::new(cx.configuration().clone());
        let counter = counter.clone();
        let output = tool.run(
          cx,
          move || -> anyhow::Result<()> {
            counter.bump();
            Ok(())
          },
          json!(null),
          None,
          &[],
        )?;
        assert!(output.targets().is_empty());
        assert!(output.task().is_some());
        Ok(())
      }),
  );

  project.build(registry.clone(), "build.cake").await.unwrap();
  project.build(registry, "build.cake").await.unwrap();
  assert_eq!(runs.get(), 2);
}

/// `build.cake` concatenates `in.txt` with every file named in `in.txt`'s
/// first line, reporting those files as discovered inputs.
fn include_project(project: &TestProject, runs: &Counter) -> Arc<ScriptRegistry> {
  let runs = runs.clone();
  let registry = ScriptRegistry::new()
    .with(project.path("config.cake"), |_| Ok(()))
    .with(project.path("build.cake"), move |cx: &Script| {
      let tool = ScriptTool::new(cx.configuration().clone());
      let root = cx.configuration().base_dir().to_path_buf();
      let runs = runs.clone();
      let func = move || -> anyhow::Result<Vec<String>> {
        runs.bump();
        let text = std::fs::read_to_string(root.join("in.txt"))?;
        let included: Vec<String> = text
          .lines()
          .next()
          .unwrap_or_default()
          .split_whitespace()
          .map(str::to_string)
          .collect();
        let mut out = text.clone();
        for name in &included {
          out.push_str(&std::fs::read_to_string(root.join(name))?);
        }
        std::fs::write(root.join("out.txt"), out)?;
        Ok(included)
      };
      tool.run_scanned(
        cx,
        func,
        json!("include"),
        Some(vec!["out.txt".to_string()]),
        &[Source::from("in.txt")],
      )?;
      Ok(())
    });
  Arc::new(registry)
}

#[tokio::test(flavor = "multi_thread")]
async fn discovered_inputs_are_tracked() {
  let project = TestProject::new();
  project.write_file("in.txt", "part.txt\n");
  project.write_file("part.txt", "one");
  let runs = Counter::default();

  project.build(include_project(&project, &runs), "build.cake").await.unwrap();
  project.build(include_project(&project, &runs), "build.cake").await.unwrap();
  assert_eq!(runs.get(), 1);

  project.write_file("part.txt", "two");
  project.build(include_project(&project, &runs), "build.cake").await.unwrap();
  assert_eq!(runs.get(), 2);
  assert_eq!(project.read_file("out.txt"), "part.txt\ntwo");
}
