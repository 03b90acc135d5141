use corkboard_shared::CurrentUser;
use tracing::info;

/// Whatever owns authentication. The core only
/// reads the current user and asks for logout.
pub trait SessionProvider {
  fn current_user(&self) -> Option<CurrentUser>;

  fn logout(&mut self);
}

/// The session value handed to a workspace.
/// Nothing in the core looks a user up on its
/// own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
  user: Option<CurrentUser>
}

impl Session {
  pub fn signed_in(user: CurrentUser) -> Self {
    Self { user: Some(user) }
  }

  pub fn anonymous() -> Self {
    Self::default()
  }

  pub fn from_provider(
    provider: &dyn SessionProvider
  ) -> Self {
    Self {
      user: provider.current_user()
    }
  }

  /// `None` hides user-dependent UI.
  pub fn current_user(
    &self
  ) -> Option<&CurrentUser> {
    self.user.as_ref()
  }

  pub fn is_signed_in(&self) -> bool {
    self.user.is_some()
  }
}

/// Session backed by a fixed user, as the CLI
/// builds it from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticSession {
  user: Option<CurrentUser>
}

impl StaticSession {
  pub fn new(user: Option<CurrentUser>) -> Self {
    Self { user }
  }
}

impl SessionProvider for StaticSession {
  fn current_user(&self) -> Option<CurrentUser> {
    self.user.clone()
  }

  fn logout(&mut self) {
    if let Some(user) = self.user.take() {
      info!(email = %user.email, "logged out");
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn session_snapshot_and_logout() {
    let mut provider =
      StaticSession::new(Some(CurrentUser {
        name:  "Ada Lovelace".to_string(),
        email: "ada@example.com".to_string()
      }));

    let session =
      Session::from_provider(&provider);
    assert!(session.is_signed_in());
    assert_eq!(
      session
        .current_user()
        .map(|u| u.initials()),
      Some("AL".to_string())
    );

    provider.logout();
    assert!(
      !Session::from_provider(&provider)
        .is_signed_in()
    );
  }
}
