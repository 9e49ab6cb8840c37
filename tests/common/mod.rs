//! Shared test utilities for E2E tests.
//!
//! This module provides common fixtures and helper functions to reduce
//! duplication across test files.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_file("openapi.yaml", specs::MINIMAL);
//!     // ... test code
//! }
//! ```

use assert_fs::prelude::*;
use std::path::Path;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::specs;
    pub use super::TestFixture;
}

/// Common OpenAPI snippets for testing.
#[allow(dead_code)]
pub mod specs {
    /// A document without references.
    pub const MINIMAL: &str = r#"openapi: 3.1.0
info:
  title: Minimal
  version: 1.0.0
paths: {}
"#;

    /// An entry document referencing `schemas/user.yaml` from two operations.
    pub const DIAMOND: &str = r#"openapi: 3.1.0
info:
  title: Users
  version: 1.0.0
paths:
  /users:
    get:
      responses:
        '200':
          description: ok
          content:
            application/json:
              schema:
                $ref: schemas/user.yaml#/User
  /me:
    get:
      responses:
        '200':
          description: ok
          content:
            application/json:
              schema:
                $ref: ./schemas/user.yaml#/User
"#;

    /// The schema file referenced by [`DIAMOND`].
    pub const USER: &str = r#"User:
  type: object
  properties:
    id:
      type: integer
"#;

    /// An entry document referencing a fragment that does not exist.
    pub const BROKEN: &str = r#"openapi: 3.1.0
info:
  title: Broken
  version: 1.0.0
components:
  schemas:
    Missing:
      $ref: schemas/user.yaml#/DoesNotExist
"#;

    /// An entry document referencing a remote schema.
    pub const REMOTE: &str = r#"openapi: 3.1.0
info:
  title: Remote
  version: 1.0.0
components:
  schemas:
    Pet:
      $ref: https://example.invalid/pet.yaml#/Pet
"#;

    /// Invalid YAML for error testing.
    pub const INVALID_YAML: &str = "openapi: [3.1.0";
}

/// A test fixture that provides a temporary directory of spec files.
///
/// # Example
///
/// ```rust,ignore
/// let fixture = TestFixture::new()
///     .with_file("openapi.yaml", specs::DIAMOND)
///     .with_file("schemas/user.yaml", specs::USER);
///
/// fixture.command().arg("bundle").arg("openapi.yaml").assert().success();
/// ```
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    /// Create a new test fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Add the diamond entry document and its schema file.
    pub fn with_diamond(self) -> Self {
        self.with_file("openapi.yaml", specs::DIAMOND)
            .with_file("schemas/user.yaml", specs::USER)
    }

    /// Add a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Create a child path in the temp directory.
    #[allow(dead_code)]
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }

    /// Create a command configured to run in this fixture's directory.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("oapi");
        cmd.current_dir(self.path());
        cmd.env_remove("OAPI_CONFIG").env_remove("OAPI_VERBOSE");
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_creates_temp_dir() {
        let fixture = TestFixture::new();
        assert!(fixture.path().exists());
    }

    #[test]
    fn test_fixture_with_nested_file() {
        let fixture = TestFixture::new().with_diamond();
        assert!(fixture.path().join("schemas/user.yaml").exists());
    }

    #[test]
    fn test_specs_are_valid_yaml() {
        for spec in [specs::MINIMAL, specs::DIAMOND, specs::USER, specs::BROKEN, specs::REMOTE] {
            serde_yaml::from_str::<serde_yaml::Value>(spec).expect("Spec should be valid YAML");
        }
    }

    #[test]
    fn test_invalid_yaml_is_actually_invalid() {
        let result = serde_yaml::from_str::<serde_yaml::Value>(specs::INVALID_YAML);
        assert!(result.is_err(), "INVALID_YAML should not parse");
    }
}
