//! Privileged write context
//!
//! An import writes as the administrative account. The switch is scoped: an
//! [`ElevatedSession`] switches on creation and switches back when dropped, so
//! early returns and errors restore the previous account too.

use crate::core::types::LocalId;
use parking_lot::Mutex;
use tracing::debug;

/// A user account
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    /// Local id of the user entity
    pub id: LocalId,
    /// Display name, when known
    pub name: Option<String>,
}

impl Account {
    /// Account with local id `id`
    pub fn new(id: LocalId) -> Self {
        Self { id, name: None }
    }

    /// Builder-style display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The anonymous account
    pub fn anonymous() -> Self {
        Self::new(LocalId::new(0))
    }
}

/// Switches the account that subsequent writes are attributed to
pub trait AccountSwitcher {
    /// Make `account` current, remembering the previous one
    fn switch_to(&self, account: &Account);

    /// Restore the account that was current before the last `switch_to`
    fn switch_back(&self);
}

/// Switcher keeping a stack of accounts above an anonymous base
#[derive(Debug, Default)]
pub struct StackAccountSwitcher {
    stack: Mutex<Vec<Account>>,
}

impl StackAccountSwitcher {
    /// Create a switcher with only the anonymous account active
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently active account
    pub fn current(&self) -> Account {
        self.stack.lock().last().cloned().unwrap_or_else(Account::anonymous)
    }

    /// Number of active switches
    pub fn depth(&self) -> usize {
        self.stack.lock().len()
    }
}

impl AccountSwitcher for StackAccountSwitcher {
    fn switch_to(&self, account: &Account) {
        self.stack.lock().push(account.clone());
    }

    fn switch_back(&self) {
        self.stack.lock().pop();
    }
}

/// Context handed to every write of a run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    account: Account,
}

impl Session {
    /// Session acting as `account`
    pub fn new(account: Account) -> Self {
        Self { account }
    }

    /// Account the writes are attributed to
    pub fn account(&self) -> &Account {
        &self.account
    }
}

/// Scoped account switch, released on drop
pub struct ElevatedSession<'a> {
    switcher: &'a dyn AccountSwitcher,
    session: Session,
}

impl<'a> ElevatedSession<'a> {
    /// Switch to `account` until the returned guard is dropped
    pub fn begin(switcher: &'a dyn AccountSwitcher, account: Account) -> Self {
        debug!(account = %account.id, "switching to import account");
        switcher.switch_to(&account);
        Self {
            switcher,
            session: Session::new(account),
        }
    }

    /// Write context for this session
    pub fn session(&self) -> &Session {
        &self.session
    }
}

impl Drop for ElevatedSession<'_> {
    fn drop(&mut self) {
        self.switcher.switch_back();
        debug!(account = %self.session.account.id, "switched back from import account");
    }
}
