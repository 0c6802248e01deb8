/// Statement Binding Module
///
/// Caller-supplied binders receive a [`Bindings`] handle instead of the raw
/// prepared statement. It records which placeholders were given a value so
/// the executors can refuse to run a statement with holes in it.
///
/// When a statement uses numbered or named placeholders, numbers that do not
/// appear in the SQL (`?2` in `?1 ... ?3`) are not required. Anonymous `?`
/// placeholders are only checked in statements that use nothing else.

use rusqlite::types::Value;
use rusqlite::{Statement, ToSql};

use crate::core::error::FailureCause;

/// Parameter binding view over a prepared statement.
pub struct Bindings<'s, 'c> {
    statement: &'s mut Statement<'c>,
    bound: Vec<bool>,
    required: Vec<bool>,
}

impl<'s, 'c> Bindings<'s, 'c> {
    pub(crate) fn new(statement: &'s mut Statement<'c>) -> Self {
        let count = statement.parameter_count();
        // Only numbered and named placeholders have a name
        let named: Vec<bool> = (1..=count)
            .map(|index| statement.parameter_name(index).is_some())
            .collect();
        let required = if named.contains(&true) {
            named
        } else {
            vec![true; count]
        };
        Bindings {
            statement,
            bound: vec![false; count],
            required,
        }
    }

    /// Number of placeholders in the statement.
    pub fn parameter_count(&self) -> usize {
        self.bound.len()
    }

    /// Binds `value` to the 1-based placeholder `index`.
    pub fn bind<T: ToSql>(&mut self, index: usize, value: T) -> rusqlite::Result<()> {
        if index == 0 || index > self.bound.len() {
            return Err(rusqlite::Error::InvalidParameterCount(index, self.bound.len()));
        }
        self.statement.raw_bind_parameter(index, value)?;
        self.bound[index - 1] = true;
        Ok(())
    }

    /// Binds `value` to a named placeholder such as `:robot`.
    pub fn bind_named<T: ToSql>(&mut self, name: &str, value: T) -> rusqlite::Result<()> {
        match self.statement.parameter_index(name)? {
            Some(index) => self.bind(index, value),
            None => Err(rusqlite::Error::InvalidParameterName(name.to_string())),
        }
    }

    /// Binds `values` to placeholders `1..=values.len()` in order.
    pub fn bind_all(&mut self, values: &[&dyn ToSql]) -> rusqlite::Result<()> {
        for (offset, value) in values.iter().enumerate() {
            self.bind(offset + 1, value)?;
        }
        Ok(())
    }

    /// First placeholder (1-based) present in the SQL that has not been bound.
    pub fn first_unbound(&self) -> Option<usize> {
        self.bound
            .iter()
            .zip(&self.required)
            .position(|(bound, required)| *required && !bound)
            .map(|i| i + 1)
    }
}

/// Binder for statements without placeholders.
pub fn no_params(_: &mut Bindings<'_, '_>) -> rusqlite::Result<()> {
    Ok(())
}

/// Binder that assigns owned values positionally.
pub fn values(params: Vec<Value>) -> impl FnOnce(&mut Bindings<'_, '_>) -> rusqlite::Result<()> {
    move |bindings: &mut Bindings<'_, '_>| {
        for (offset, value) in params.into_iter().enumerate() {
            bindings.bind(offset + 1, value)?;
        }
        Ok(())
    }
}

/// Runs `bind` against `statement` and checks that nothing was left unbound.
pub(crate) fn apply<B>(statement: &mut Statement<'_>, bind: B) -> Result<(), FailureCause>
where
    B: FnOnce(&mut Bindings<'_, '_>) -> rusqlite::Result<()>,
{
    let mut bindings = Bindings::new(statement);
    bind(&mut bindings)?;
    match bindings.first_unbound() {
        Some(index) => Err(FailureCause::UnboundParameter {
            index,
            count: bindings.parameter_count(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE robot (robot TEXT, active INTEGER);").unwrap();
        conn
    }

    #[test]
    fn test_all_placeholders_bound() {
        let conn = connection();
        let mut stmt = conn.prepare("SELECT * FROM robot WHERE robot = ?1 AND active = ?2").unwrap();
        let result = apply(&mut stmt, |b| b.bind_all(&[&"chrome-1", &true]));
        assert!(result.is_ok());
    }

    #[test]
    fn test_missing_placeholder_is_reported() {
        let conn = connection();
        let mut stmt = conn.prepare("SELECT * FROM robot WHERE robot = ?1 AND active = ?2").unwrap();
        match apply(&mut stmt, |b| b.bind(1, "chrome-1")) {
            Err(FailureCause::UnboundParameter { index, count }) => {
                assert_eq!(index, 2);
                assert_eq!(count, 2);
            }
            other => panic!("Expected unbound parameter, got {:?}", other),
        }
    }

    #[test]
    fn test_named_binding() {
        let conn = connection();
        let mut stmt = conn.prepare("SELECT * FROM robot WHERE robot = :robot").unwrap();
        assert!(apply(&mut stmt, |b| b.bind_named(":robot", "chrome-1")).is_ok());

        let mut stmt = conn.prepare("SELECT * FROM robot WHERE robot = :robot").unwrap();
        match apply(&mut stmt, |b| b.bind_named(":missing", "x")) {
            Err(FailureCause::Sqlite(rusqlite::Error::InvalidParameterName(name))) => {
                assert_eq!(name, ":missing")
            }
            other => panic!("Expected invalid parameter name, got {:?}", other),
        }
    }

    #[test]
    fn test_out_of_range_index() {
        let conn = connection();
        let mut stmt = conn.prepare("SELECT * FROM robot WHERE robot = ?1").unwrap();
        let result = apply(&mut stmt, |b| b.bind(3, "x"));
        assert!(matches!(
            result,
            Err(FailureCause::Sqlite(rusqlite::Error::InvalidParameterCount(3, 1)))
        ));
    }

    #[test]
    fn test_numbering_gaps_are_not_required() {
        let conn = connection();
        let mut stmt = conn.prepare("SELECT * FROM robot WHERE robot = ?1 AND active = ?3").unwrap();
        assert!(apply(&mut stmt, |b| {
            b.bind(1, "chrome-1")?;
            b.bind(3, true)
        })
        .is_ok());

        let mut stmt = conn.prepare("SELECT * FROM robot WHERE robot = ?1 AND active = ?3").unwrap();
        match apply(&mut stmt, |b| b.bind(1, "chrome-1")) {
            Err(FailureCause::UnboundParameter { index, count }) => {
                assert_eq!(index, 3);
                assert_eq!(count, 3);
            }
            other => panic!("Expected unbound parameter, got {:?}", other),
        }
    }

    #[test]
    fn test_anonymous_placeholders_are_required() {
        let conn = connection();
        let mut stmt = conn.prepare("SELECT * FROM robot WHERE robot = ? AND active = ?").unwrap();
        assert!(matches!(
            apply(&mut stmt, |b| b.bind(1, "chrome-1")),
            Err(FailureCause::UnboundParameter { index: 2, count: 2 })
        ));
    }

    #[test]
    fn test_value_binder() {
        let conn = connection();
        let mut stmt = conn.prepare("INSERT INTO robot VALUES (?1, ?2)").unwrap();
        apply(&mut stmt, values(vec![Value::Text("chrome-1".into()), Value::Integer(1)])).unwrap();
        assert_eq!(stmt.raw_execute().unwrap(), 1);
    }

    #[test]
    fn test_no_params() {
        let conn = connection();
        let mut stmt = conn.prepare("SELECT COUNT(*) FROM robot").unwrap();
        assert!(apply(&mut stmt, no_params).is_ok());
    }
}
