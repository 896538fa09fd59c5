use crate::error::SetupError;

/// How a provisioning run ended.
#[derive(Debug)]
pub enum Outcome {
    Success,
    /// Finished, but the user has to act before the setup is usable.
    FollowUp(String),
    Failure(SetupError),
}

impl Outcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Success | Outcome::FollowUp(_) => 0,
            Outcome::Failure(err) => err.kind().exit_code(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure(_))
    }
}

impl From<Result<Outcome, SetupError>> for Outcome {
    fn from(result: Result<Outcome, SetupError>) -> Self {
        result.unwrap_or_else(Outcome::Failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn follow_up_is_not_a_failure() {
        let outcome = Outcome::FollowUp("Please rebuild".to_string());
        assert_eq!(outcome.exit_code(), 0);
        assert!(!outcome.is_failure());
    }

    #[test]
    fn failure_exit_code_follows_kind() {
        let outcome = Outcome::from(Err(SetupError::NotFound {
            what: "mono-2.pc".to_string(),
            location: "lib".to_string(),
            hint: None,
        }));
        assert!(outcome.is_failure());
        assert_eq!(outcome.exit_code(), 4);
    }
}
