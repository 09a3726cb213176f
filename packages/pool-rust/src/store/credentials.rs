//! Dial configuration for the backing store.

use std::fmt;

/// Read-only credential set handed to every worker at construction.
///
/// Encryption and authentication mechanics are the connector's concern;
/// this is just what it needs to dial.
#[derive(Clone)]
pub struct Credentials {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl Credentials {
    /// Create a credential set.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            user: user.into(),
            password: password.into(),
            database: database.into(),
        }
    }
}

// The password must never reach logs, so both renderings skip it.

impl fmt::Display for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "host={},user={},db={},port={}",
            self.host, self.user, self.database, self.port
        )
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("database", &self.database)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renderings_omit_the_password() {
        let credentials = Credentials::new("db.internal", 3306, "app", "hunter2", "game");
        assert_eq!(
            credentials.to_string(),
            "host=db.internal,user=app,db=game,port=3306"
        );
        assert!(!format!("{credentials:?}").contains("hunter2"));
    }
}
