//! Building a small C project with `CompilerTool`, using stand-in compiler
//! and archiver scripts that record every invocation.

use std::os::unix::fs::PermissionsExt;
use std::sync::Arc;

use cake_lib::engine::EngineConfig;
use cake_lib::lua::LuaScriptLoader;
use cake_lib::script::{Script, ScriptRegistry};
use cake_lib::target::Source;
use cake_lib::tool::AsTool;
use cake_lib::tools::CompilerTool;
use cake_lib::variant::Variant;

use super::common::TestProject;

/// Concatenates its inputs into `-o`; compiling also appends
/// `include/config.h` and writes a depfile naming it.
const FAKE_CC: &str = r#"#!/bin/sh
echo "cc $*" >> calls.log
out=
dep=
inputs=
while [ $# -gt 0 ]; do
  case "$1" in
    -o) out="$2"; shift ;;
    -MF) dep="$2"; shift ;;
    -x|-include) shift ;;
    -*) ;;
    *) inputs="$inputs $1" ;;
  esac
  shift
done
cat $inputs > "$out"
if [ -n "$dep" ]; then
  cat include/config.h >> "$out"
  echo "$out:$inputs include/config.h" > "$dep"
fi
"#;

const FAKE_AR: &str = r#"#!/bin/sh
echo "ar $*" >> calls.log
shift
out="$1"
shift
cat "$@" > "$out"
"#;

const BROKEN_CC: &str = "#!/bin/sh\necho \"src/main.c:1: error: expected ';'\" >&2\nexit 1\n";

fn write_script(project: &TestProject, name: &str, body: &str) {
  project.write_file(name, body);
  let path = project.path(name);
  let mut permissions = std::fs::metadata(&path).unwrap().permissions();
  permissions.set_mode(0o755);
  std::fs::set_permissions(&path, permissions).unwrap();
}

fn c_sources(project: &TestProject) {
  write_script(project, "tools/cc", FAKE_CC);
  write_script(project, "tools/ar", FAKE_AR);
  write_script(project, "tools/broken-cc", BROKEN_CC);
  project.write_file("src/main.c", "main\n");
  project.write_file("src/util.c", "util\n");
  project.write_file("include/config.h", "v1\n");
}

/// `build.cake` compiles `src/util.c` into `lib/libutil.a` and links it
/// with `src/main.c` into `bin/app`.
fn app_project(project: &TestProject, cc: &str, defines: &[&str]) -> Arc<ScriptRegistry> {
  let cc = project.path(cc).to_string_lossy().into_owned();
  let ar = project.path("tools/ar").to_string_lossy().into_owned();
  let defines: Vec<String> = defines.iter().map(|d| d.to_string()).collect();
  let registry = ScriptRegistry::new()
    .with(project.path("config.cake"), |_| Ok(()))
    .with(project.path("build.cake"), move |cx: &Script| {
      let mut compiler = CompilerTool::new(cx.configuration().clone());
      compiler.tool_mut().set("cc", cc.as_str())?;
      compiler.tool_mut().set("ar", ar.as_str())?;
      for define in &defines {
        compiler.push("defines", define)?;
      }

      let util: Vec<Source> = compiler
        .objects(cx, "obj", &[Source::from("src/util.c")])?
        .into_iter()
        .map(Source::from)
        .collect();
      let library = compiler.library(cx, "lib/util", &util)?;
      let main = compiler.object(cx, "obj/main", "src/main.c")?;
      compiler.program(cx, "bin/app", &[Source::from(main), Source::from(library)])?;
      Ok(())
    });
  Arc::new(registry)
}

fn calls(project: &TestProject) -> usize {
  project.read_file("calls.log").lines().count()
}

#[tokio::test(flavor = "multi_thread")]
async fn builds_objects_library_and_program() {
  let project = TestProject::new();
  c_sources(&project);

  project.build(app_project(&project, "tools/cc", &[]), "build.cake").await.unwrap();

  assert_eq!(calls(&project), 4);
  assert!(project.exists("obj/util.o"));
  assert!(project.exists("obj/main.o"));
  assert_eq!(project.read_file("lib/libutil.a"), "util\nv1\n");
  assert_eq!(project.read_file("bin/app"), "main\nv1\nutil\nv1\n");
  assert!(project.read_file("calls.log").contains("-MD -MF obj/main.o.d -o obj/main.o src/main.c"));
}

#[tokio::test(flavor = "multi_thread")]
async fn warm_build_runs_nothing() {
  let project = TestProject::new();
  c_sources(&project);

  project.build(app_project(&project, "tools/cc", &[]), "build.cake").await.unwrap();
  project.build(app_project(&project, "tools/cc", &[]), "build.cake").await.unwrap();

  assert_eq!(calls(&project), 4);
}

#[tokio::test(flavor = "multi_thread")]
async fn editing_an_included_header_rebuilds_dependents() {
  let project = TestProject::new();
  c_sources(&project);
  project.build(app_project(&project, "tools/cc", &[]), "build.cake").await.unwrap();

  project.write_file("include/config.h", "v2\n");
  project.build(app_project(&project, "tools/cc", &[]), "build.cake").await.unwrap();

  assert_eq!(calls(&project), 8);
  assert_eq!(project.read_file("bin/app"), "main\nv2\nutil\nv2\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn new_flags_recompile_but_identical_objects_do_not_relink() {
  let project = TestProject::new();
  c_sources(&project);
  project.build(app_project(&project, "tools/cc", &[]), "build.cake").await.unwrap();

  project
    .build(app_project(&project, "tools/cc", &["NDEBUG"]), "build.cake")
    .await
    .unwrap();

  let log = project.read_file("calls.log");
  assert_eq!(calls(&project), 6);
  assert_eq!(log.matches("-DNDEBUG").count(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn compiler_errors_fail_the_build() {
  let project = TestProject::new();
  c_sources(&project);

  let err = project
    .build(app_project(&project, "tools/broken-cc", &[]), "build.cake")
    .await
    .unwrap_err();

  assert!(err.to_string().contains("expected ';'"), "unexpected error: {}", err);
  assert!(!project.exists("bin/app"));
}

#[tokio::test(flavor = "multi_thread")]
async fn lua_scripts_compile_with_attributes() {
  let project = TestProject::new();
  c_sources(&project);
  project.write_file("config.cake", "-- host build only\n");
  project.write_file(
    "build.cake",
    r#"
    local app = cake.compile{
      program = "bin/app",
      sources = { "src/main.c", "src/util.c" },
      object_dir = "obj",
      cc = cake.cwd("tools/cc"),
      defines = { "FROM_LUA" },
    }
    cake.set_result("app", app.path)
    "#,
  );

  let script = project
    .build_with(Arc::new(LuaScriptLoader::new()), EngineConfig::default(), "build.cake", &Variant::new())
    .await
    .unwrap();

  assert_eq!(script.result("app").unwrap().to_string(), "bin/app");
  assert_eq!(project.read_file("bin/app"), "main\nv1\nutil\nv1\n");
  assert_eq!(project.read_file("calls.log").matches("-DFROM_LUA").count(), 2);
}
