//! Parsing and resolution of [`PaneAddress`] (spec §3).
//!
//! Grounded in workmux's own target-resolution style (`cli.rs`'s pane/session
//! lookup helpers) but adapted to the four address forms spec.md names
//! instead of workmux's worktree-path addressing.

use crate::config::ConfigStore;
use crate::error::{Result, TermtapError};
use crate::multiplexer::{Multiplexer, PaneId, PaneInfo};

/// A human-written target for a pane (spec §3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaneAddress {
    /// A raw multiplexer-minted id, e.g. `%42`.
    Id(PaneId),
    /// `session:window.pane`, with `window`/`pane` defaulting to 0 when omitted.
    Triple {
        session: String,
        window: usize,
        pane: usize,
    },
    /// A bare session name; resolves to one or more panes.
    Session(String),
    /// `session.service`, resolved through configuration.
    Service { session: String, service: String },
}

impl PaneAddress {
    /// Parse the textual form a user or config file would write.
    ///
    /// Disambiguation order: a leading `%` followed only by digits is always
    /// a [`PaneAddress::Id`]. Otherwise a `:` marks a triple (the right side
    /// may itself contain `.` for the pane index). Failing that, a `.` marks
    /// a service reference. Anything else is a bare session name.
    pub fn parse(raw: &str) -> PaneAddress {
        if let Some(digits) = raw.strip_prefix('%')
            && !digits.is_empty()
            && digits.chars().all(|c| c.is_ascii_digit())
        {
            return PaneAddress::Id(raw.to_string());
        }

        if let Some((session, rest)) = raw.split_once(':') {
            let (window, pane) = match rest.split_once('.') {
                Some((w, p)) => (w.parse().unwrap_or(0), p.parse().unwrap_or(0)),
                None => (rest.parse().unwrap_or(0), 0),
            };
            return PaneAddress::Triple {
                session: session.to_string(),
                window,
                pane,
            };
        }

        if let Some((session, service)) = raw.split_once('.') {
            return PaneAddress::Service {
                session: session.to_string(),
                service: service.to_string(),
            };
        }

        PaneAddress::Session(raw.to_string())
    }

    /// Canonical textual form, as a lookup key or error message.
    pub fn as_string(&self) -> String {
        match self {
            PaneAddress::Id(id) => id.clone(),
            PaneAddress::Triple { session, window, pane } => {
                format!("{session}:{window}.{pane}")
            }
            PaneAddress::Session(name) => name.clone(),
            PaneAddress::Service { session, service } => format!("{session}.{service}"),
        }
    }

    /// The session component, present for every address form.
    pub fn session_name(&self) -> &str {
        match self {
            PaneAddress::Id(_) => "",
            PaneAddress::Triple { session, .. } => session,
            PaneAddress::Session(name) => name,
            PaneAddress::Service { session, .. } => session,
        }
    }
}

/// Resolve an address against the live pane set. Never fails for an empty
/// result -- callers decide whether zero matches is an error (it always is,
/// via [`resolve_one`]) or an acceptable "nothing to do" (multi-pane ops).
pub fn resolve(
    address: &PaneAddress,
    multiplexer: &dyn Multiplexer,
    config: &dyn ConfigStore,
) -> Result<Vec<PaneId>> {
    Ok(find_matches(address, multiplexer, config)?
        .into_iter()
        .map(|p| p.pane_id)
        .collect())
}

/// Same matching logic as [`resolve`], but keeps the full [`PaneInfo`] so
/// callers that need session/window/pane for a human-readable address (an
/// ambiguity error, say) don't have to re-enumerate panes themselves.
fn find_matches(
    address: &PaneAddress,
    multiplexer: &dyn Multiplexer,
    config: &dyn ConfigStore,
) -> Result<Vec<PaneInfo>> {
    let panes = multiplexer
        .enumerate_panes()
        .map_err(|e| TermtapError::Multiplexer { message: e.to_string() })?;

    let matches: Vec<PaneInfo> = match address {
        PaneAddress::Id(id) => panes.into_iter().filter(|p| &p.pane_id == id).collect(),
        PaneAddress::Triple { session, window, pane } => panes
            .into_iter()
            .filter(|p| &p.session == session && p.window == *window && p.pane_index == *pane)
            .collect(),
        PaneAddress::Session(name) => panes.into_iter().filter(|p| &p.session == name).collect(),
        PaneAddress::Service { session, service } => {
            return resolve_service(session, service, &panes, config);
        }
    };

    Ok(matches)
}

fn resolve_service(
    session: &str,
    service: &str,
    panes: &[PaneInfo],
    config: &dyn ConfigStore,
) -> Result<Vec<PaneInfo>> {
    let group = config
        .get_init_group(session)
        .map_err(|e| TermtapError::Multiplexer { message: e.to_string() })?
        .ok_or_else(|| TermtapError::ServiceNotFound {
            session: session.to_string(),
            service: service.to_string(),
        })?;

    if !group.services.contains_key(service) {
        return Err(TermtapError::ServiceNotFound {
            session: session.to_string(),
            service: service.to_string(),
        });
    }

    // A service's pane is the window in its session named after the service
    // (spec §6: init groups give each service its own window).
    let matches: Vec<PaneInfo> = panes
        .iter()
        .filter(|p| p.session == session && p.window_name == service)
        .cloned()
        .collect();

    if matches.is_empty() {
        return Err(TermtapError::ServiceNotFound {
            session: session.to_string(),
            service: service.to_string(),
        });
    }
    Ok(matches)
}

/// The `session:window.pane` form used in ambiguity errors, matching
/// [`crate::pane::Pane::address`]'s own formatting.
fn human_address(pane: &PaneInfo) -> String {
    format!("{}:{}.{}", pane.session, pane.window, pane.pane_index)
}

/// Resolve to exactly one pane, as send/read/interrupt/kill require.
pub fn resolve_one(
    address: &PaneAddress,
    multiplexer: &dyn Multiplexer,
    config: &dyn ConfigStore,
) -> Result<PaneId> {
    let matches = find_matches(address, multiplexer, config)?;
    match matches.as_slice() {
        [] => Err(TermtapError::AddressNotFound {
            address: address.as_string(),
        }),
        [single] => Ok(single.pane_id.clone()),
        many => Err(TermtapError::AddressAmbiguous {
            address: address.as_string(),
            candidates: many.iter().map(human_address).collect(),
        }),
    }
}

/// Enforce the forbidden-pane rule: termtap may never send to or kill the
/// pane it is itself running in (spec §3, §4.A).
pub fn reject_current_pane(pane_id: &PaneId, multiplexer: &dyn Multiplexer) -> Result<()> {
    if multiplexer.current_pane_id().as_deref() == Some(pane_id.as_str()) {
        return Err(TermtapError::CurrentPane);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pane_id() {
        assert_eq!(PaneAddress::parse("%42"), PaneAddress::Id("%42".to_string()));
    }

    #[test]
    fn rejects_non_numeric_percent_as_session() {
        // "%abc" isn't a valid pane id shape, so it falls through to a bare
        // session name rather than being misparsed as an Id.
        assert_eq!(
            PaneAddress::parse("%abc"),
            PaneAddress::Session("%abc".to_string())
        );
    }

    #[test]
    fn parses_triple_with_both_window_and_pane() {
        assert_eq!(
            PaneAddress::parse("work:2.1"),
            PaneAddress::Triple {
                session: "work".to_string(),
                window: 2,
                pane: 1,
            }
        );
    }

    #[test]
    fn parses_triple_defaulting_pane() {
        assert_eq!(
            PaneAddress::parse("work:2"),
            PaneAddress::Triple {
                session: "work".to_string(),
                window: 2,
                pane: 0,
            }
        );
    }

    #[test]
    fn parses_service_reference() {
        assert_eq!(
            PaneAddress::parse("work.web"),
            PaneAddress::Service {
                session: "work".to_string(),
                service: "web".to_string(),
            }
        );
    }

    #[test]
    fn parses_bare_session() {
        assert_eq!(PaneAddress::parse("work"), PaneAddress::Session("work".to_string()));
    }
}
