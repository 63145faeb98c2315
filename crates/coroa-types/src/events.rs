use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Message, Profile};

/// Events sent over the WebSocket gateway. All of them are targeted at one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server confirms successful authentication
    Ready { user_id: Uuid },

    /// A like on the timeline turned into a match
    MatchCreate { profile: Profile },

    /// A scripted reply was appended to a conversation
    ConversationMessage { profile_id: String, message: Message },

    /// A matched user sent a chat message
    ChatMessage { from_user_id: Uuid, message: Message },

    /// Premium status changed through the payment webhook
    PremiumUpdate { is_premium: bool },
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Authenticate the WebSocket connection
    Identify { token: String },
}
