//! Script orchestration: lazy handles, execute, include and variants.

use std::sync::Arc;
use std::time::Duration;

use cake_lib::engine::{Engine, EngineConfig};
use cake_lib::script::{GetOptions, Script, ScriptError, ScriptRegistry, ScriptTool};
use cake_lib::tool::Value;
use cake_lib::variant::{Keywords, Variant};
use tokio::runtime::Handle;

use super::common::{Counter, TestProject};

fn engine(registry: ScriptRegistry) -> Engine {
  Engine::new(Handle::current(), Arc::new(registry), EngineConfig::default())
}

/// A config script registering debug and release variants.
fn with_variants(registry: ScriptRegistry, project: &TestProject) -> ScriptRegistry {
  registry.with(project.path("config.cake"), |cx: &Script| {
    cx.configuration().add_variant(Variant::new().with("release", "false"));
    cx.configuration().add_variant(Variant::new().with("release", "true"));
    Ok(())
  })
}

fn debug() -> Variant {
  Variant::new().with("release", "false")
}

#[tokio::test(flavor = "multi_thread")]
async fn get_is_lazy() {
  let project = TestProject::new();
  let runs = Counter::default();
  let counter = runs.clone();
  let registry = with_variants(ScriptRegistry::new(), &project)
    .with(project.path("lib/build.cake"), move |cx: &Script| {
      counter.bump();
      cx.set_result("lib", format!("lib-{}", cx.variant().keyword("release").unwrap_or("?")));
      Ok(())
    })
    .with(project.path("app/build.cake"), |_| Ok(()));
  let engine = engine(registry);
  let configuration = engine.get_configuration(project.path("config.cake")).unwrap();
  let app = configuration.execute("app/build.cake", &debug()).unwrap();
  app.wait().await.unwrap();

  let tool = ScriptTool::new(configuration.clone());
  let result = tool.get_result(&app, "lib/build.cake", "lib").unwrap();
  assert_eq!(result.name(), "lib");
  assert_eq!(runs.get(), 0);

  assert_eq!(result.resolve().await.unwrap(), Value::from("lib-false"));
  assert_eq!(runs.get(), 1);

  // A second handle to the same script and variant reuses the execution.
  let again = tool.get(&app, "lib/build.cake", GetOptions::new()).unwrap();
  again.execute().unwrap().wait().await.unwrap();
  assert_eq!(runs.get(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn get_narrows_the_callers_variant() {
  let project = TestProject::new();
  let registry = with_variants(ScriptRegistry::new(), &project)
    .with(project.path("lib/build.cake"), |cx: &Script| {
      cx.set_result("variant", cx.variant().to_string());
      Ok(())
    })
    .with(project.path("app/build.cake"), |_| Ok(()));
  let engine = engine(registry);
  let configuration = engine.get_configuration(project.path("config.cake")).unwrap();
  let app = configuration.execute("app/build.cake", &debug()).unwrap();

  let tool = ScriptTool::new(configuration.clone());
  let release = tool
    .get(&app, "lib/build.cake", GetOptions::new().keyword("release", "true"))
    .unwrap()
    .get_result("variant");
  assert_eq!(release.resolve().await.unwrap(), Value::from("release=true"));

  let unknown = tool
    .get(&app, "lib/build.cake", GetOptions::new().keyword("platform", "win32"))
    .unwrap();
  assert!(matches!(unknown.execute(), Err(ScriptError::VariantNotFound { .. })));
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_result_is_an_error() {
  let project = TestProject::new();
  let registry = with_variants(ScriptRegistry::new(), &project)
    .with(project.path("lib/build.cake"), |_| Ok(()))
    .with(project.path("app/build.cake"), |_| Ok(()));
  let engine = engine(registry);
  let configuration = engine.get_configuration(project.path("config.cake")).unwrap();
  let app = configuration.execute("app/build.cake", &debug()).unwrap();

  let tool = ScriptTool::new(configuration.clone());
  let result = tool.get_result(&app, "lib/build.cake", "nothing").unwrap();
  assert!(matches!(
    result.resolve().await,
    Err(ScriptError::ResultNotFound { ref name, .. }) if name == "nothing"
  ));
}

#[tokio::test(flavor = "multi_thread")]
async fn get_in_another_configuration() {
  let project = TestProject::new();
  let registry = with_variants(ScriptRegistry::new(), &project)
    .with(project.path("app/build.cake"), |_| Ok(()))
    .with(project.path("vendor/zlib/config.cake"), |cx: &Script| {
      cx.configuration().add_variant(Variant::new().with("flavour", "static"));
      Ok(())
    })
    .with(project.path("vendor/zlib/build.cake"), |cx: &Script| {
      cx.set_result("config", cx.configuration().path().to_string_lossy().into_owned());
      Ok(())
    });
  let engine = engine(registry);
  let configuration = engine.get_configuration(project.path("config.cake")).unwrap();
  let app = configuration.execute("app/build.cake", &debug()).unwrap();

  let tool = ScriptTool::new(configuration.clone());
  let searched = tool
    .get(&app, "vendor/zlib/build.cake", GetOptions::new().config_script_name("config.cake"))
    .unwrap()
    .get_result("config");
  let expected = project.path("vendor/zlib/config.cake").to_string_lossy().into_owned();
  assert_eq!(searched.resolve().await.unwrap(), Value::from(expected.clone()));

  let explicit = tool
    .get(
      &app,
      "vendor/zlib/build.cake",
      GetOptions::new().config_script("vendor/zlib/config.cake"),
    )
    .unwrap()
    .get_result("config");
  assert_eq!(explicit.resolve().await.unwrap(), Value::from(expected));
  assert_eq!(engine.configurations().len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn execute_holds_the_caller_open() {
  let project = TestProject::new();
  let runs = Counter::default();
  let counter = runs.clone();
  let registry = with_variants(ScriptRegistry::new(), &project)
    .with(project.path("sub/build.cake"), move |cx: &Script| {
      std::thread::sleep(std::time::Duration::from_millis(50));
      assert_eq!(cx.variant().keyword("release"), Some("true"));
      counter.bump();
      Ok(())
    })
    .with(project.path("build.cake"), |cx: &Script| {
      let tool = ScriptTool::new(cx.configuration().clone());
      let keywords = Keywords::from([("release".to_string(), "true".to_string())]);
      let started = tool.execute(cx, "sub/build.cake", &keywords)?;
      assert!(started.is_one());
      Ok(())
    });

  project.build_with(Arc::new(registry), EngineConfig::default(), "build.cake", &debug())
    .await
    .unwrap();
  assert_eq!(runs.get(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn include_runs_once_in_the_callers_context() {
  let project = TestProject::new();
  let runs = Counter::default();
  let counter = runs.clone();
  let registry = ScriptRegistry::new()
    .with(project.path("config.cake"), |_| Ok(()))
    .with(project.path("common.cake"), move |cx: &Script| {
      counter.bump();
      cx.set_result("common", cx.path().to_string_lossy().into_owned());
      Ok(())
    })
    .with(project.path("build.cake"), |cx: &Script| {
      let tool = ScriptTool::new(cx.configuration().clone());
      tool.include(cx, "common.cake")?;
      tool.include(cx, vec!["common.cake", "./common.cake"])?;
      // Including itself is a no-op.
      tool.include(cx, "build.cake")?;
      Ok(())
    });

  let script = project.build(Arc::new(registry), "build.cake").await.unwrap();
  assert_eq!(runs.get(), 1);
  assert_eq!(
    script.result("common"),
    Some(Value::from(project.path("build.cake").to_string_lossy().into_owned()))
  );
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_script_paths_are_rejected() {
  let project = TestProject::new();
  let registry = ScriptRegistry::new()
    .with(project.path("config.cake"), |_| Ok(()))
    .with(project.path("build.cake"), |cx: &Script| {
      let tool = ScriptTool::new(cx.configuration().clone());
      assert!(matches!(
        tool.get(cx, "", GetOptions::new()),
        Err(ScriptError::InvalidScriptPath(_))
      ));
      assert!(matches!(tool.include(cx, ""), Err(ScriptError::InvalidScriptPath(_))));
      assert!(matches!(
        tool.execute(cx, "", &Keywords::new()),
        Err(ScriptError::InvalidScriptPath(_))
      ));
      Ok(())
    });

  project.build(Arc::new(registry), "build.cake").await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn ambiguous_variant_is_reported() {
  let project = TestProject::new();
  let registry = with_variants(ScriptRegistry::new(), &project).with(project.path("build.cake"), |_| Ok(()));
  let engine = engine(registry);
  let configuration = engine.get_configuration(project.path("config.cake")).unwrap();
  assert!(matches!(
    configuration.find_variant(&Keywords::new(), None),
    Err(ScriptError::AmbiguousVariant { count: 2, .. })
  ));
}

#[tokio::test(flavor = "multi_thread")]
async fn get_handle_holds_the_caller_open() {
  let project = TestProject::new();
  let runs = Counter::default();
  let counter = runs.clone();
  let registry = with_variants(ScriptRegistry::new(), &project)
    .with(project.path("sub/build.cake"), move |_| {
      std::thread::sleep(Duration::from_millis(300));
      counter.bump();
      anyhow::bail!("sub-build broke")
    })
    .with(project.path("build.cake"), |cx: &Script| {
      let tool = ScriptTool::new(cx.configuration().clone());
      tool.get(cx, "sub/build.cake", GetOptions::new())?.execute()?;
      Ok(())
    });

  let err = project
    .build_with(Arc::new(registry), EngineConfig::default(), "build.cake", &debug())
    .await
    .unwrap_err();
  assert_eq!(runs.get(), 1);
  assert!(err.to_string().contains("sub-build broke"), "{err}");
}

#[tokio::test(flavor = "multi_thread")]
async fn wait_all_covers_scripts_started_late() {
  let project = TestProject::new();
  let runs = Counter::default();
  let counter = runs.clone();
  let registry = with_variants(ScriptRegistry::new(), &project)
    .with(project.path("lib/build.cake"), move |_| {
      std::thread::sleep(Duration::from_millis(200));
      counter.bump();
      Ok(())
    })
    .with(project.path("app/build.cake"), |_| Ok(()));
  let engine = engine(registry);
  let configuration = engine.get_configuration(project.path("config.cake")).unwrap();
  let app = configuration.execute("app/build.cake", &debug()).unwrap();
  app.wait().await.unwrap();

  // The handle is used after its creator has already finished.
  let tool = ScriptTool::new(configuration.clone());
  tool.get(&app, "lib/build.cake", GetOptions::new()).unwrap().execute().unwrap();

  let outcomes = engine.wait_all().await;
  assert_eq!(runs.get(), 1);
  assert_eq!(outcomes.len(), 2);
  assert!(outcomes.iter().all(|(_, result)| result.is_ok()));
  let paths: Vec<_> = outcomes.iter().map(|(script, _)| script.path().to_path_buf()).collect();
  assert!(paths.contains(&project.path("lib/build.cake")));
  assert!(paths.contains(&project.path("app/build.cake")));
}

#[tokio::test(flavor = "multi_thread")]
async fn config_script_requesting_itself_fails() {
  let project = TestProject::new();
  let registry = ScriptRegistry::new()
    .with(project.path("config.cake"), |cx: &Script| {
      let tool = ScriptTool::new(cx.configuration().clone());
      tool
        .get(cx, "build.cake", GetOptions::new().config_script("config.cake"))?
        .execute()?;
      Ok(())
    })
    .with(project.path("build.cake"), |_| Ok(()));
  let engine = engine(registry);

  let path = project.path("config.cake");
  let loading = engine.clone();
  let result = tokio::time::timeout(
    Duration::from_secs(5),
    tokio::task::spawn_blocking(move || loading.get_configuration(path).map(|_| ())),
  )
  .await
  .expect("loading the configuration hung")
  .unwrap();

  let err = result.unwrap_err();
  assert!(err.to_string().contains("requested by its own config script"), "{err}");
  assert!(engine.configurations().is_empty());
}
