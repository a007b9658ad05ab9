use std::fmt;

use serde::{Deserialize, Serialize};

/// Reference to a console user (assignee or actor). Users themselves are owned by the
/// authentication layer; the lifecycle only stores the reference.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
