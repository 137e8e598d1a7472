use crate::types::RowValues;

/// A named parameter. The name carries its `@` sigil, e.g. `@EmployeeName`.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub value: RowValues,
}

impl Param {
    /// Create a parameter, adding the `@` sigil when `name` lacks one.
    pub fn new(name: impl Into<String>, value: impl Into<RowValues>) -> Self {
        let name = name.into();
        let name = if name.starts_with(['@', ':', '$']) {
            name
        } else {
            format!("@{name}")
        };
        Self {
            name,
            value: value.into(),
        }
    }

    /// Parameter name without its sigil.
    #[must_use]
    pub fn bare_name(&self) -> &str {
        self.name.trim_start_matches(['@', ':', '$'])
    }
}

/// Whether [`Command::sql`] is statement text or the name of a stored procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CommandKind {
    #[default]
    Text,
    /// Resolved through the profile's procedure catalogue.
    Procedure,
}

/// A SQL command and its named parameters bundled together.
///
/// ```rust
/// use sql_entity::prelude::*;
///
/// let cmd = Command::text("SELECT * FROM Mst_Employee WHERE Age > @age")
///     .param("age", 30);
/// assert_eq!(cmd.params[0].name, "@age");
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Command {
    pub sql: String,
    pub kind: CommandKind,
    pub params: Vec<Param>,
}

impl Command {
    pub fn new(sql: impl Into<String>, kind: CommandKind, params: Vec<Param>) -> Self {
        Self {
            sql: sql.into(),
            kind,
            params,
        }
    }

    /// Plain SQL text with no parameters.
    pub fn text(sql: impl Into<String>) -> Self {
        Self::new(sql, CommandKind::Text, Vec::new())
    }

    /// A call to the catalogued procedure `name`.
    pub fn procedure(name: impl Into<String>) -> Self {
        Self::new(name, CommandKind::Procedure, Vec::new())
    }

    #[must_use]
    pub fn with_params(mut self, params: Vec<Param>) -> Self {
        self.params = params;
        self
    }

    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: impl Into<RowValues>) -> Self {
        self.params.push(Param::new(name, value));
        self
    }
}

impl From<&str> for Command {
    fn from(sql: &str) -> Self {
        Command::text(sql)
    }
}

impl From<String> for Command {
    fn from(sql: String) -> Self {
        Command::text(sql)
    }
}
