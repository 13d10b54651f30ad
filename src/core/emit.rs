// Every file the build writes is claimed here first. A name may be claimed
// again only by identical bytes.

use crate::utils::{KuraError, Result};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    New,
    /// Same name, same bytes: already scheduled for writing.
    Duplicate,
}

#[derive(Debug, Clone)]
struct Claim {
    digest: String,
    owner: String,
}

#[derive(Debug, Default)]
pub struct EmitRegistry {
    claims: BTreeMap<String, Claim>,
}

impl EmitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `output` (outdir-relative) for content with full digest `digest`.
    pub fn claim(&mut self, output: &str, digest: &str, owner: &str) -> Result<ClaimOutcome> {
        match self.claims.get(output) {
            Some(existing) if existing.digest == digest => Ok(ClaimOutcome::Duplicate),
            Some(existing) => Err(KuraError::HashCollision {
                output: output.to_string(),
                existing: existing.owner.clone(),
                incoming: owner.to_string(),
            }),
            None => {
                self.claims.insert(
                    output.to_string(),
                    Claim {
                        digest: digest.to_string(),
                        owner: owner.to_string(),
                    },
                );
                Ok(ClaimOutcome::New)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_content_may_share_a_name() {
        let mut registry = EmitRegistry::new();
        assert_eq!(
            registry.claim("logo.png", "aaa", "images/logo.png").unwrap(),
            ClaimOutcome::New
        );
        assert_eq!(
            registry.claim("logo.png", "aaa", "css/img/logo.png").unwrap(),
            ClaimOutcome::Duplicate
        );
        // The first owner keeps the name.
        let err = registry.claim("logo.png", "bbb", "img/logo.png").unwrap_err();
        assert!(err.to_string().contains("images/logo.png"), "{}", err);
    }

    #[test]
    fn different_content_with_same_name_is_fatal() {
        let mut registry = EmitRegistry::new();
        registry.claim("logo.png", "aaa", "images/logo.png").unwrap();
        let err = registry
            .claim("logo.png", "bbb", "css/img/logo.png")
            .unwrap_err();
        match err {
            KuraError::HashCollision { output, existing, incoming } => {
                assert_eq!(output, "logo.png");
                assert_eq!(existing, "images/logo.png");
                assert_eq!(incoming, "css/img/logo.png");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
