//! Path string helpers used by build descriptions.
//!
//! Pure string manipulation; nothing here touches the file system except
//! [`absolute`], which reads the current directory. Both `/` and `\` count as
//! separators when looking for a file name's extension.

use std::collections::BTreeMap;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::util::OneOrMany;

/// Cross product of path segments.
///
/// A single-valued argument is joined onto every result; a list argument
/// multiplies the results. Ordering follows the arguments left to right. The
/// result is `One` only if every argument was.
///
/// ```
/// use cake_lib::path::join;
/// use cake_lib::util::OneOrMany;
///
/// let joined = join(["a".into(), vec!["b", "c"].into(), "d".into()]);
/// assert_eq!(joined, OneOrMany::Many(vec!["a/b/d".to_string(), "a/c/d".to_string()]));
/// ```
pub fn join<I>(args: I) -> OneOrMany<String>
where
  I: IntoIterator<Item = OneOrMany<String>>,
  I::IntoIter: DoubleEndedIterator,
{
  let mut args = args.into_iter().rev();
  let Some(last) = args.next() else {
    return OneOrMany::One(String::new());
  };

  let mut any_lists = !last.is_one();
  let mut results = last.into_vec();
  for arg in args {
    any_lists |= !arg.is_one();
    results = arg
      .into_vec()
      .iter()
      .flat_map(|head| results.iter().map(move |tail| join_two(head, tail)))
      .collect();
  }

  if any_lists {
    OneOrMany::Many(results)
  } else {
    OneOrMany::One(results.into_iter().next().unwrap_or_default())
  }
}

fn join_two(head: &str, tail: &str) -> String {
  Path::new(head).join(tail).to_string_lossy().into_owned()
}

/// Index just past the last separator.
fn base_start(path: &str) -> usize {
  path.rfind(['/', '\\']).map(|i| i + 1).unwrap_or(0)
}

/// Index of the dot starting the extension, if the last path component has
/// one. A leading dot, or a run of only dots, does not start an extension.
fn extension_start(path: &str) -> Option<usize> {
  let start = base_start(path);
  let dot = start + path[start..].rfind('.')?;
  let stem = &path[start..dot];
  (dot > start && !stem.chars().all(|c| c == '.')).then_some(dot)
}

pub fn dir_name(path: &str) -> &str {
  match path.rfind(['/', '\\']) {
    Some(0) => &path[..1],
    Some(i) => &path[..i],
    None => "",
  }
}

pub fn base_name(path: &str) -> &str {
  &path[base_start(path)..]
}

pub fn has_extension(path: &str) -> bool {
  extension_start(path).is_some()
}

/// The extension of the last component including its dot, or `""`.
pub fn extension(path: &str) -> &str {
  extension_start(path).map(|i| &path[i..]).unwrap_or("")
}

pub fn strip_extension(path: &str) -> &str {
  extension_start(path).map(|i| &path[..i]).unwrap_or(path)
}

pub fn base_name_without_extension(path: &str) -> &str {
  let start = base_start(path);
  match extension_start(path) {
    Some(end) => &path[start..end],
    None => &path[start..],
  }
}

/// Prefix the file-name part of `path`.
pub fn add_prefix(path: &str, prefix: &str) -> String {
  if prefix.is_empty() {
    return path.to_string();
  }
  let head = dir_name(path);
  let tail = format!("{}{}", prefix, base_name(path));
  if head.is_empty() { tail } else { join_two(head, &tail) }
}

/// Append `ext` unless `path` already ends with it.
pub fn force_extension(path: &str, ext: &str) -> String {
  if path.ends_with(ext) {
    path.to_string()
  } else {
    format!("{}{}", path, ext)
  }
}

/// Add both `prefix` and `suffix` unless the extension already is `suffix`.
pub fn force_prefix_suffix(path: &str, prefix: &str, suffix: &str) -> String {
  if extension(path) == suffix {
    path.to_string()
  } else {
    format!("{}{}", add_prefix(path, prefix), suffix)
  }
}

/// Longest common leading directory of two paths.
pub fn common_path<'a>(a: &'a str, b: &str) -> &'a str {
  let mut safe = 0;
  let mut matched = 0;
  for (i, (x, y)) in a.bytes().zip(b.bytes()).enumerate() {
    if x != y {
      return &a[..safe];
    }
    if x == b'/' || x == b'\\' {
      safe = i;
    }
    matched = i + 1;
  }

  let is_sep = |c: Option<u8>| matches!(c, Some(b'/') | Some(b'\\'));
  if a.len() > matched {
    if is_sep(a.as_bytes().get(matched).copied()) {
      safe = matched;
    }
  } else if b.len() > matched {
    if is_sep(b.as_bytes().get(matched).copied()) {
      safe = matched;
    }
  } else if !a.is_empty() && !is_sep(a.as_bytes().last().copied()) {
    safe = a.len();
  }
  &a[..safe]
}

/// Resolve `.` and `..` lexically.
///
/// A `..` that would climb above a root is dropped; one that would climb
/// above the start of a relative path is kept.
pub fn normalize(path: &Path) -> PathBuf {
  let mut normalized = PathBuf::new();
  for component in path.components() {
    match component {
      Component::CurDir => {}
      Component::ParentDir => match normalized.components().next_back() {
        Some(Component::Normal(_)) => {
          normalized.pop();
        }
        Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
        _ => normalized.push(".."),
      },
      other => normalized.push(other),
    }
  }
  normalized
}

/// Make `path` absolute against the current directory and normalise it.
pub fn absolute(path: &Path) -> io::Result<PathBuf> {
  if path.is_absolute() {
    Ok(normalize(path))
  } else {
    Ok(normalize(&std::env::current_dir()?.join(path)))
  }
}

/// Expand `$name` and `${name}` references from `env`, recursively.
///
/// `$$` is a literal dollar and nothing inside single quotes is expanded.
/// Unknown names become `{MISSING_SYMBOL_<name>}`.
pub fn expand_vars(text: &str, env: &BTreeMap<String, String>) -> String {
  expand_vars_at(text, env, 0)
}

const MAX_EXPANSION_DEPTH: usize = 32;

fn expand_vars_at(text: &str, env: &BTreeMap<String, String>, depth: usize) -> String {
  if !text.contains('$') || depth > MAX_EXPANSION_DEPTH {
    return text.to_string();
  }

  let mut out = String::with_capacity(text.len());
  let mut rest = text;
  while let Some(c) = rest.chars().next() {
    match c {
      '\'' => match rest[1..].find('\'') {
        Some(end) => {
          out.push_str(&rest[..end + 2]);
          rest = &rest[end + 2..];
        }
        None => {
          out.push_str(rest);
          rest = "";
        }
      },
      '$' => {
        let after = &rest[1..];
        if let Some(tail) = after.strip_prefix('$') {
          out.push('$');
          rest = tail;
        } else if let Some(tail) = after.strip_prefix('{') {
          match tail.find('}') {
            Some(end) => {
              push_var(&mut out, &tail[..end], env, depth);
              rest = &tail[end + 1..];
            }
            None => {
              out.push_str(rest);
              rest = "";
            }
          }
        } else {
          let len = after
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
            .unwrap_or(after.len());
          push_var(&mut out, &after[..len], env, depth);
          rest = &after[len..];
        }
      }
      _ => {
        out.push(c);
        rest = &rest[c.len_utf8()..];
      }
    }
  }
  out
}

fn push_var(out: &mut String, name: &str, env: &BTreeMap<String, String>, depth: usize) {
  match env.get(name) {
    Some(value) => out.push_str(&expand_vars_at(value, env, depth + 1)),
    None => {
      out.push_str("{MISSING_SYMBOL_");
      out.push_str(name);
      out.push('}');
    }
  }
}
