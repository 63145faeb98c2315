use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use coroa_types::models::{Conversation, Message};
use coroa_types::storage::{StorageKey, Store, StoreExt};

use crate::catalog::{self, Line, Stage};

/// Fresh conversation at stage 0 with no messages.
pub fn start(profile_id: &str) -> Conversation {
    Conversation {
        profile_id: profile_id.to_string(),
        messages: Vec::new(),
        stage: 0,
        pending: 0,
    }
}

pub fn record_user_message(conv: &mut Conversation, text: &str, now: DateTime<Utc>) -> Message {
    let message = Message::text(text, true, now);
    conv.messages.push(message.clone());
    message
}

/// Appends the lines of the current stage and moves the cursor forward.
/// Returns nothing once the script is exhausted.
pub fn advance(conv: &mut Conversation, script: &[Stage], now: DateTime<Utc>) -> Vec<Message> {
    let Some(stage) = script.get(conv.stage) else {
        return Vec::new();
    };

    let replies: Vec<Message> = stage
        .iter()
        .map(|line| match *line {
            Line::Text(text) => Message::text(text, false, now),
            Line::Audio { transcript, duration } => Message::audio(transcript, duration, false, now),
        })
        .collect();

    conv.messages.extend(replies.iter().cloned());
    conv.stage += 1;
    replies
}

pub fn is_idle(conv: &Conversation, script: &[Stage]) -> bool {
    conv.stage >= script.len()
}

/// Reserves the next undelivered stage for a reply. False once every stage
/// is delivered or already promised.
pub fn claim_reply(conv: &mut Conversation, script: &[Stage]) -> bool {
    if conv.stage + conv.pending >= script.len() {
        return false;
    }
    conv.pending += 1;
    true
}

/// Loads, steps and saves scripted conversations for one user.
pub struct Stepper<'a, S: Store + ?Sized> {
    store: &'a S,
    user_id: Uuid,
}

impl<'a, S: Store + ?Sized> Stepper<'a, S> {
    pub fn new(store: &'a S, user_id: Uuid) -> Self {
        Self { store, user_id }
    }

    fn key(&self, profile_id: &str) -> StorageKey {
        StorageKey::conversation(self.user_id, profile_id)
    }

    fn script(profile_id: &str) -> Result<&'static [Stage]> {
        catalog::find(profile_id)
            .map(|p| p.script)
            .ok_or_else(|| anyhow!("no script for profile '{}'", profile_id))
    }

    /// Stored conversation, or a fresh unsaved one.
    pub fn open(&self, profile_id: &str) -> Result<Conversation> {
        Self::script(profile_id)?;
        Ok(self
            .store
            .load(&self.key(profile_id))?
            .unwrap_or_else(|| start(profile_id)))
    }

    /// Persists a stage-0 conversation unless one already exists.
    pub fn initialize(&self, profile_id: &str) -> Result<Conversation> {
        Self::script(profile_id)?;
        let key = self.key(profile_id);
        if let Some(existing) = self.store.load::<Conversation>(&key)? {
            return Ok(existing);
        }

        let conv = start(profile_id);
        self.store.save(&key, &conv)?;
        debug!("Initialized conversation {}", key);
        Ok(conv)
    }

    /// Appends a user message. The bool tells whether a scripted reply is still due.
    pub fn send(&self, profile_id: &str, text: &str, now: DateTime<Utc>) -> Result<(Message, bool)> {
        let script = Self::script(profile_id)?;
        let mut conv = self.open(profile_id)?;
        let message = record_user_message(&mut conv, text, now);
        let reply_pending = claim_reply(&mut conv, script);
        self.store.save(&self.key(profile_id), &conv)?;
        Ok((message, reply_pending))
    }

    /// Delivers the next promised stage, if any.
    pub fn reply(&self, profile_id: &str, now: DateTime<Utc>) -> Result<Vec<Message>> {
        let script = Self::script(profile_id)?;
        let mut conv = self.open(profile_id)?;
        if conv.pending == 0 {
            return Ok(Vec::new());
        }
        conv.pending -= 1;
        let replies = advance(&mut conv, script, now);
        self.store.save(&self.key(profile_id), &conv)?;
        Ok(replies)
    }

    pub fn delete(&self, profile_id: &str) -> Result<()> {
        self.store.delete(&self.key(profile_id))
    }
}
