//! End-to-end builds from Lua scripts on disk.

use std::sync::Arc;

use cake_lib::engine::EngineConfig;
use cake_lib::lua::LuaScriptLoader;
use cake_lib::script::{Script, ScriptError};
use cake_lib::tool::Value;
use cake_lib::variant::Variant;

use super::common::TestProject;

const CONFIG: &str = r#"
cake.add_variant{ release = "false" }
cake.add_variant{ release = "true" }
"#;

const BUILD: &str = r#"
local greeting = cake.write("out/greeting.txt", "hello " .. cake.variant.release)
local copy = cake.copy(greeting, "out/copy.txt")
cake.set_result("copy", copy)

cake.include("common.cake")

local lib = cake.get_result("lib/build.cake", "name")
cake.set_result("lib", lib:get())
"#;

const COMMON: &str = r#"
cake.set_result("included_from", cake.path)
"#;

const LIB: &str = r#"
cake.set_result("name", "lib-" .. cake.variant.release)
"#;

fn project() -> TestProject {
  let project = TestProject::new();
  project.write_file("config.cake", CONFIG);
  project.write_file("build.cake", BUILD);
  project.write_file("common.cake", COMMON);
  project.write_file("lib/build.cake", LIB);
  project
}

fn release(value: &str) -> Variant {
  Variant::new().with("release", value)
}

async fn build(project: &TestProject, script: &str, variant: &Variant) -> Result<Script, ScriptError> {
  project
    .build_with(Arc::new(LuaScriptLoader::new()), EngineConfig::default(), script, variant)
    .await
}

#[tokio::test(flavor = "multi_thread")]
async fn builds_files_and_publishes_results() {
  let project = project();
  let script = build(&project, "build.cake", &release("false")).await.unwrap();

  assert_eq!(project.read_file("out/greeting.txt"), "hello false");
  assert_eq!(project.read_file("out/copy.txt"), "hello false");

  let copy = script.result("copy").unwrap();
  assert_eq!(copy.as_target().map(|t| t.path.as_str()), Some("out/copy.txt"));
  assert_eq!(
    script.result("included_from"),
    Some(Value::from(project.path("build.cake").to_string_lossy().into_owned()))
  );
  assert_eq!(script.result("lib"), Some(Value::from("lib-false")));
}

#[tokio::test(flavor = "multi_thread")]
async fn up_to_date_steps_are_skipped() {
  let project = project();
  build(&project, "build.cake", &release("false")).await.unwrap();

  // Targets are not hashed, so a skipped copy leaves this in place.
  project.write_file("out/copy.txt", "tampered");
  build(&project, "build.cake", &release("false")).await.unwrap();
  assert_eq!(project.read_file("out/copy.txt"), "tampered");

  // New contents change the write step's arguments, which changes the
  // copy's source.
  build(&project, "build.cake", &release("true")).await.unwrap();
  assert_eq!(project.read_file("out/greeting.txt"), "hello true");
  assert_eq!(project.read_file("out/copy.txt"), "hello true");
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_variant_keyword_fails_the_script() {
  let project = project();
  project.write_file("bad.cake", "local compiler = cake.variant.compiler");

  let err = build(&project, "bad.cake", &release("false")).await.unwrap_err();
  assert!(err.to_string().contains("compiler"), "unexpected error: {}", err);
}

#[tokio::test(flavor = "multi_thread")]
async fn lua_errors_name_the_script() {
  let project = project();
  project.write_file("bad.cake", "error('nope')");

  let err = build(&project, "bad.cake", &release("false")).await.unwrap_err();
  let message = err.to_string();
  assert!(message.contains("nope"), "unexpected error: {}", message);
  assert!(message.contains("bad.cake"), "unexpected error: {}", message);
}

#[tokio::test(flavor = "multi_thread")]
async fn execute_starts_scripts_with_narrowed_variant() {
  let project = project();
  project.write_file(
    "all.cake",
    r#"
    local started = cake.execute({ "lib/build.cake" }, { release = "true" })
    assert(#started == 1)
    "#,
  );
  project.write_file(
    "lib/build.cake",
    r#"cake.write("out/lib.txt", "lib " .. cake.variant.release)"#,
  );

  build(&project, "all.cake", &release("false")).await.unwrap();
  assert_eq!(project.read_file("out/lib.txt"), "lib true");
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread")]
async fn shell_steps_run_in_the_script_directory() {
  let project = project();
  project.write_file(
    "tools/build.cake",
    r#"
    cake.shell{
      command = "echo $GREETING > shell.txt",
      targets = { "tools/shell.txt" },
      env = { GREETING = "hi" },
    }
    "#,
  );

  build(&project, "tools/build.cake", &release("false")).await.unwrap();
  assert_eq!(project.read_file("tools/shell.txt").trim(), "hi");
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread")]
async fn failing_shell_step_fails_the_build() {
  let project = project();
  project.write_file("fail.cake", r#"cake.shell{ command = "exit 7" }"#);

  let err = build(&project, "fail.cake", &release("false")).await.unwrap_err();
  assert!(err.to_string().contains("exit code"), "unexpected error: {}", err);
}
