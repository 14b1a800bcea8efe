use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::errors::SidelineError;

/// Identity of the locally signed-in member.
///
/// `access_token` keys the membership record; `member_token` is the opaque
/// participant identifier written into session participant lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberProfile {
    pub access_token: String,
    pub member_token: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Premium membership record: a purchase flag with its timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PremiumMembership {
    pub member_token: String,
    pub purchased_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateStatus {
    Admitted,
    Blocked,
}

/// Membership-record boundary for the premium gate.
#[async_trait]
pub trait MembershipStore: Send + Sync {
    async fn is_premium(&self, access_token: &str) -> Result<bool, SidelineError>;
    async fn grant_premium(&self, profile: &MemberProfile) -> Result<(), SidelineError>;
}

/// In-process reference implementation of [`MembershipStore`].
#[derive(Default)]
pub struct MemoryMembershipStore {
    members: Mutex<HashMap<String, PremiumMembership>>,
}

impl MemoryMembershipStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MembershipStore for MemoryMembershipStore {
    async fn is_premium(&self, access_token: &str) -> Result<bool, SidelineError> {
        let members = self.members.lock().await;
        Ok(members.contains_key(access_token))
    }

    async fn grant_premium(&self, profile: &MemberProfile) -> Result<(), SidelineError> {
        let mut members = self.members.lock().await;
        members.insert(
            profile.access_token.clone(),
            PremiumMembership {
                member_token: profile.member_token.clone(),
                purchased_at: Utc::now(),
            },
        );
        Ok(())
    }
}

/// Blocks viewer join until the member's premium flag is set.
#[derive(Clone)]
pub struct PremiumGate {
    members: Arc<dyn MembershipStore>,
}

impl PremiumGate {
    pub fn new(members: Arc<dyn MembershipStore>) -> Self {
        Self { members }
    }

    /// Look up the membership record for this access token.
    /// An empty token is blocked without a store read.
    pub async fn check(&self, access_token: &str) -> Result<GateStatus, SidelineError> {
        if access_token.trim().is_empty() {
            return Ok(GateStatus::Blocked);
        }
        let premium = self.members.is_premium(access_token).await?;
        Ok(if premium {
            GateStatus::Admitted
        } else {
            GateStatus::Blocked
        })
    }

    /// "Buy now": write the membership record and re-check.
    ///
    /// TODO: route the purchase through a real payment/receipt verification
    /// step before granting; today this marks the member premium directly.
    pub async fn purchase(&self, profile: &MemberProfile) -> Result<GateStatus, SidelineError> {
        tracing::info!("granting premium membership for {}", profile.member_token);
        self.members.grant_premium(profile).await?;
        self.check(&profile.access_token).await
    }
}
