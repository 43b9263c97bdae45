//! Clean command integration tests.

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn clean_forces_the_next_build() {
  let env = TestEnv::copy_project();
  env.cake_cmd().args(["build", "-k", "release=false"]).assert().success();

  env
    .cake_cmd()
    .arg("clean")
    .assert()
    .success()
    .stdout(predicate::str::contains("Removed 3 dependency record(s)"));

  env
    .cake_cmd()
    .args(["build", "-v", "-k", "release=false"])
    .assert()
    .success()
    .stderr(predicate::str::contains("no dependency record"));
}
