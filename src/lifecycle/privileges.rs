//! Process identity switching.
//!
//! # Responsibilities
//! - Resolve a configured user/group to concrete uid/gid
//! - Permanently drop to that identity before the service starts
//! - Refuse to run the service as root
//!
//! The switch order is supplementary groups, then gid, then uid; once the uid
//! is changed the process can no longer change its groups.

use std::fmt;
use std::path::PathBuf;

use nix::unistd::{getegid, geteuid, getgid, getuid, setgid, setuid, Gid, Group, Uid, User};

use crate::config::LauncherConfig;

/// The identity could not be assumed. Always fatal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot run as `{identity}`: {reason}")]
pub struct PrivilegeError {
    pub identity: String,
    pub reason: String,
}

impl PrivilegeError {
    fn new(identity: impl fmt::Display, reason: impl Into<String>) -> Self {
        Self {
            identity: identity.to_string(),
            reason: reason.into(),
        }
    }
}

/// A configured, unresolved identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// User name or numeric uid.
    pub user: String,
    /// Group name or numeric gid; the user's primary group when unset.
    pub group: Option<String>,
}

impl Identity {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            group: None,
        }
    }

    pub fn from_config(config: &LauncherConfig) -> Option<Self> {
        config.user.as_ref().map(|user| Self {
            user: user.clone(),
            group: config.group.clone(),
        })
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.group {
            Some(group) => write!(f, "{}:{}", self.user, group),
            None => f.write_str(&self.user),
        }
    }
}

/// A resolved identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub name: String,
    pub uid: Uid,
    pub gid: Gid,
    pub home: PathBuf,
}

/// Resolve `identity` against the system user and group databases.
///
/// Numeric ids without a passwd entry are accepted, as container images
/// often run with an arbitrary uid.
pub fn resolve(identity: &Identity) -> Result<Credentials, PrivilegeError> {
    let lookup_err = |e: nix::Error| PrivilegeError::new(identity, format!("user lookup failed: {e}"));

    let (name, uid, primary_gid, home) = match identity.user.trim().parse::<u32>() {
        Ok(raw) => match User::from_uid(Uid::from_raw(raw)).map_err(lookup_err)? {
            Some(user) => (user.name, user.uid, user.gid, user.dir),
            None => (raw.to_string(), Uid::from_raw(raw), Gid::from_raw(raw), PathBuf::from("/")),
        },
        Err(_) => {
            let user = User::from_name(identity.user.trim())
                .map_err(lookup_err)?
                .ok_or_else(|| PrivilegeError::new(identity, "no such user"))?;
            (user.name, user.uid, user.gid, user.dir)
        }
    };

    let gid = match &identity.group {
        None => primary_gid,
        Some(group) => match group.trim().parse::<u32>() {
            Ok(raw) => Gid::from_raw(raw),
            Err(_) => {
                Group::from_name(group.trim())
                    .map_err(|e| PrivilegeError::new(identity, format!("group lookup failed: {e}")))?
                    .ok_or_else(|| PrivilegeError::new(identity, format!("no such group `{group}`")))?
                    .gid
            }
        },
    };

    if uid.is_root() {
        return Err(PrivilegeError::new(identity, "resolves to uid 0"));
    }
    if gid.as_raw() == 0 {
        return Err(PrivilegeError::new(identity, "resolves to gid 0"));
    }

    Ok(Credentials {
        name,
        uid,
        gid,
        home,
    })
}

/// Something that can move the current process to an unprivileged identity.
pub trait PrivilegeDrop {
    /// Assume `identity` for the rest of the process lifetime.
    ///
    /// With no identity, succeeds only if the process is already unprivileged.
    fn assume(&self, identity: Option<&Identity>) -> Result<Option<Credentials>, PrivilegeError>;
}

/// Switches identity with setgroups/setgid/setuid.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPrivileges;

impl PrivilegeDrop for SystemPrivileges {
    fn assume(&self, identity: Option<&Identity>) -> Result<Option<Credentials>, PrivilegeError> {
        let Some(identity) = identity else {
            if geteuid().is_root() {
                return Err(PrivilegeError::new(
                    "root",
                    "refusing to start the service as root without a configured user",
                ));
            }
            tracing::debug!(uid = getuid().as_raw(), "No identity configured, keeping current user");
            return Ok(None);
        };

        let credentials = resolve(identity)?;
        switch_to(identity, &credentials)?;

        tracing::info!(
            user = %credentials.name,
            uid = credentials.uid.as_raw(),
            gid = credentials.gid.as_raw(),
            "Dropped privileges"
        );
        Ok(Some(credentials))
    }
}

fn switch_to(identity: &Identity, credentials: &Credentials) -> Result<(), PrivilegeError> {
    let already = getuid() == credentials.uid
        && geteuid() == credentials.uid
        && getgid() == credentials.gid
        && getegid() == credentials.gid;
    if already {
        return Ok(());
    }

    if !geteuid().is_root() {
        return Err(PrivilegeError::new(
            identity,
            format!("switching from uid {} requires root", geteuid()),
        ));
    }

    #[cfg(target_os = "linux")]
    nix::unistd::setgroups(&[credentials.gid])
        .map_err(|e| PrivilegeError::new(identity, format!("setgroups failed: {e}")))?;

    setgid(credentials.gid).map_err(|e| PrivilegeError::new(identity, format!("setgid failed: {e}")))?;
    setuid(credentials.uid).map_err(|e| PrivilegeError::new(identity, format!("setuid failed: {e}")))?;

    if setuid(Uid::from_raw(0)).is_ok() {
        return Err(PrivilegeError::new(identity, "uid 0 could be regained after switching"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_user_is_rejected() {
        let err = resolve(&Identity::new("no-such-user-warden-test")).unwrap_err();
        assert_eq!(err.reason, "no such user");
        assert_eq!(err.identity, "no-such-user-warden-test");
    }

    #[test]
    fn root_is_never_an_identity() {
        let err = resolve(&Identity::new("0")).unwrap_err();
        assert_eq!(err.reason, "resolves to uid 0");
    }

    #[test]
    fn root_group_is_rejected() {
        let identity = Identity {
            user: "65534".into(),
            group: Some("0".into()),
        };
        let err = resolve(&identity).unwrap_err();
        assert_eq!(err.reason, "resolves to gid 0");
    }

    #[test]
    fn numeric_uid_without_passwd_entry() {
        let identity = Identity {
            user: "48211".into(),
            group: Some("48212".into()),
        };
        let credentials = resolve(&identity).unwrap();
        assert_eq!(credentials.uid, Uid::from_raw(48211));
        assert_eq!(credentials.gid, Gid::from_raw(48212));
    }

    #[test]
    fn identity_display() {
        let identity = Identity {
            user: "app".into(),
            group: Some("web".into()),
        };
        assert_eq!(identity.to_string(), "app:web");
        assert_eq!(Identity::new("app").to_string(), "app");
    }

    #[test]
    fn no_identity_only_allowed_when_unprivileged() {
        let result = SystemPrivileges.assume(None);
        if geteuid().is_root() {
            assert!(result.is_err());
        } else {
            assert_eq!(result.unwrap(), None);
        }
    }

    #[test]
    fn unknown_user_never_switches() {
        let before = geteuid();
        let result = SystemPrivileges.assume(Some(&Identity::new("no-such-user-warden-test")));
        assert!(result.is_err());
        assert_eq!(geteuid(), before);
    }
}
