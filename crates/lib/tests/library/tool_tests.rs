//! Writing a tool on top of `Tool`: locked attributes, memoised queries and
//! cloning.

use cake_lib::tool::{AsTool, CloneTool, MemoKey, Tool, ToolError, Value};
use cake_lib::util::OneOrMany;

use super::common::Counter;

/// A compiler description written by a project rather than built in.
struct CustomCompiler {
  tool: Tool,
  computed: Counter,
}

impl CustomCompiler {
  fn new() -> Self {
    let tool = Tool::build(|c| {
      c.declare("cc", "gcc");
      c.declare("optimise", false);
      c.declare("defines", Vec::<String>::new());
      c.declare("obj_dir", "obj");
    });
    CustomCompiler {
      tool,
      computed: Counter::default(),
    }
  }

  fn define(&mut self, name: &str) -> Result<(), ToolError> {
    self.tool.update("defines", |defines| {
      if let Some(list) = defines.as_list_mut() {
        list.push(Value::from(name));
      }
    })
  }

  fn command_prefix(&self) -> Result<String, ToolError> {
    self.tool.try_memoise(MemoKey::new("command_prefix"), || {
      self.computed.bump();
      let mut parts = vec![self.tool.str_attr("cc")?.to_string()];
      if self.tool.bool_attr("optimise")? {
        parts.push("-O2".to_string());
      }
      for define in self.tool.attr("defines")?.as_list().unwrap_or_default() {
        parts.push(format!("-D{}", define));
      }
      Ok(parts.join(" "))
    })
  }

  fn objects(&self, sources: &[&str]) -> Result<OneOrMany<String>, ToolError> {
    let obj_dir = self.tool.str_attr("obj_dir")?.to_string();
    let sources: Vec<String> = sources.iter().map(|s| s.to_string()).collect();
    Ok(self.tool.memoise(MemoKey::new("objects").arg(sources.clone()), || {
      let stems = OneOrMany::from(sources.clone()).map(|s| cake_lib::path::base_name_without_extension(&s).to_string());
      let joined = cake_lib::path::join([OneOrMany::One(obj_dir.clone()), stems]);
      joined.map(|p| cake_lib::path::force_extension(&p, ".o"))
    }))
  }
}

impl AsTool for CustomCompiler {
  fn tool(&self) -> &Tool {
    &self.tool
  }

  fn tool_mut(&mut self) -> &mut Tool {
    &mut self.tool
  }
}

impl CloneTool for CustomCompiler {
  fn construct_default(&self) -> Self {
    CustomCompiler::new()
  }
}

#[test]
fn attributes_are_locked_after_construction() {
  let mut compiler = CustomCompiler::new();
  assert_eq!(
    compiler.tool_mut().set("optimize", true),
    Err(ToolError::UnknownAttribute("optimize".to_string()))
  );
  compiler.tool_mut().set("optimise", true).unwrap();
  assert!(matches!(
    compiler.tool().str_attr("optimise"),
    Err(ToolError::WrongType { expected: "string", .. })
  ));
}

#[test]
fn memoised_queries_recompute_after_changes() {
  let mut compiler = CustomCompiler::new();
  assert_eq!(compiler.command_prefix().unwrap(), "gcc");
  assert_eq!(compiler.command_prefix().unwrap(), "gcc");
  assert_eq!(compiler.computed.get(), 1);

  compiler.tool_mut().set("optimise", true).unwrap();
  compiler.define("NDEBUG").unwrap();
  assert_eq!(compiler.command_prefix().unwrap(), "gcc -O2 -DNDEBUG");
  assert_eq!(compiler.computed.get(), 2);
}

#[test]
fn memo_keys_include_arguments() {
  let compiler = CustomCompiler::new();
  assert_eq!(
    compiler.objects(&["src/a.c", "src/b.c"]).unwrap(),
    OneOrMany::Many(vec!["obj/a.o".to_string(), "obj/b.o".to_string()])
  );
  assert_eq!(
    compiler.objects(&["src/c.c"]).unwrap(),
    OneOrMany::Many(vec!["obj/c.o".to_string()])
  );
  assert_eq!(compiler.tool().cached_len(), 2);
}

#[test]
fn clones_are_independent() {
  let mut base = CustomCompiler::new();
  base.define("BASE").unwrap();
  assert_eq!(base.command_prefix().unwrap(), "gcc -DBASE");

  let mut release = base.clone_tool();
  assert_eq!(release.tool().cached_len(), 0);
  release.tool_mut().set("cc", "clang").unwrap();
  release.define("NDEBUG").unwrap();

  assert_eq!(release.command_prefix().unwrap(), "clang -DBASE -DNDEBUG");
  assert_eq!(base.command_prefix().unwrap(), "gcc -DBASE");
}
