//! Platform abstraction used by the poll cycle.

use async_trait::async_trait;

use platforms_helix::{HelixClient, HelixStream};

use crate::Result;
use crate::domain::Broadcast;

/// A channel name resolved to its platform id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformUser {
    /// Login name as the platform reports it.
    pub name: String,
    pub id: String,
}

/// The two bulk lookups a poll cycle performs.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Resolve channel names to ids. Unknown names are absent from the result.
    async fn resolve_users(&self, names: &[String]) -> Result<Vec<PlatformUser>>;

    /// Active broadcasts of the given ids. Offline channels are absent.
    async fn get_active_broadcasts(&self, ids: &[String]) -> Result<Vec<Broadcast>>;
}

#[async_trait]
impl PlatformClient for HelixClient {
    async fn resolve_users(&self, names: &[String]) -> Result<Vec<PlatformUser>> {
        let users = self.get_users(names).await?;
        Ok(users
            .into_iter()
            .map(|user| PlatformUser {
                name: user.login,
                id: user.id,
            })
            .collect())
    }

    async fn get_active_broadcasts(&self, ids: &[String]) -> Result<Vec<Broadcast>> {
        let streams = self.get_streams(ids).await?;
        Ok(streams.into_iter().map(Broadcast::from).collect())
    }
}

impl From<HelixStream> for Broadcast {
    fn from(stream: HelixStream) -> Self {
        Self {
            id: stream.id,
            broadcaster_id: stream.user_id,
            title: stream.title.filter(|t| !t.is_empty()),
            category: stream.game_name.filter(|g| !g.is_empty()),
            started_at: stream.started_at,
        }
    }
}
