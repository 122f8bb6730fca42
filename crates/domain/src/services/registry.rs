//! Invite registry: issuance and lookup.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::error::{CheckinError, StoreError};
use crate::models::{Invite, IssuedInvite};
use crate::services::barcode::BarcodeEncoder;
use crate::services::code_generator::CodeGenerator;
use crate::services::store::InviteStore;

/// Upper bound on regenerations after code collisions.
const MAX_GENERATION_ATTEMPTS: usize = 100;

pub const DEFAULT_MAX_NAME_LENGTH: usize = 100;

/// Issues invites and answers lookups against an [`InviteStore`].
#[derive(Clone)]
pub struct InviteRegistry {
    store: Arc<dyn InviteStore>,
    generator: CodeGenerator,
    encoder: Arc<dyn BarcodeEncoder>,
    max_name_length: usize,
}

impl InviteRegistry {
    pub fn new(
        store: Arc<dyn InviteStore>,
        generator: CodeGenerator,
        encoder: Arc<dyn BarcodeEncoder>,
    ) -> Self {
        Self {
            store,
            generator,
            encoder,
            max_name_length: DEFAULT_MAX_NAME_LENGTH,
        }
    }

    pub fn with_max_name_length(mut self, max_name_length: usize) -> Self {
        self.max_name_length = max_name_length;
        self
    }

    /// Creates and persists a new invite with a freshly rendered barcode.
    pub async fn issue(&self, invitee_name: &str) -> Result<IssuedInvite, CheckinError> {
        let invitee_name = invitee_name.trim();
        if invitee_name.is_empty() {
            return Err(CheckinError::EmptyName);
        }
        if invitee_name.chars().count() > self.max_name_length {
            return Err(CheckinError::NameTooLong {
                max: self.max_name_length,
            });
        }

        for attempt in 1..=MAX_GENERATION_ATTEMPTS {
            let code = self.generator.generate();
            let png = self.render(&code)?;
            let invite = Invite {
                code,
                invitee_name: invitee_name.to_string(),
                issued_at: Utc::now(),
            };

            match self.store.insert(&invite).await {
                Ok(()) => {
                    info!(code = %invite.code, attempt, "Invite issued");
                    return Ok(IssuedInvite { invite, png });
                }
                Err(StoreError::DuplicateCode(code)) => {
                    warn!(code = %code, attempt, "Generated code collided, regenerating");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(CheckinError::GenerationFailure(format!(
            "could not generate a unique code after {} attempts",
            MAX_GENERATION_ATTEMPTS
        )))
    }

    /// Looks up an invite by exact code.
    pub async fn lookup(&self, code: &str) -> Result<Invite, CheckinError> {
        self.store
            .find_by_code(code)
            .await?
            .ok_or_else(|| CheckinError::NotFound(code.to_string()))
    }

    pub async fn count(&self) -> Result<i64, CheckinError> {
        Ok(self.store.count().await?)
    }

    /// Renders the barcode for a code as PNG.
    pub fn render(&self, code: &str) -> Result<Vec<u8>, CheckinError> {
        self.encoder.encode(code)?.to_png()
    }

    pub fn generator(&self) -> &CodeGenerator {
        &self.generator
    }
}
