//! Root token generation used as a share validity check
//!
//! Collecting enough shares does not prove they belong to this deployment.
//! Running a root token ceremony with them does: the remote only completes
//! the ceremony for genuine unseal keys. The minted token is revoked straight
//! away. Any abort after the ceremony started cancels it, so no half-built
//! credential is left behind.

use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::error::{Result, UnsealError};
use crate::otp::{decode_token, OneTimePad};
use crate::remote::{RootGenerationStatus, SealStatusClient};
use crate::share_store::Share;

/// Where the ceremony pad comes from
#[derive(Debug, Clone, Default)]
enum PadSource {
    /// Send no pad and decode with the one the remote generates
    #[default]
    Remote,
    /// Fresh random legacy-format pad per run
    RandomLegacy,
    /// Always the same pad
    Fixed(OneTimePad),
}

/// Runs the generate, decode, and revoke sequence
#[derive(Debug, Clone, Default)]
pub struct RootTokenVerifier {
    pad: PadSource,
}

impl RootTokenVerifier {
    /// Verifier that lets the remote generate the pad
    pub fn new() -> Self {
        Self::default()
    }

    /// Verifier sending a fresh 16-byte pad per run, for servers that
    /// predate remote-generated pads
    pub fn legacy() -> Self {
        Self {
            pad: PadSource::RandomLegacy,
        }
    }

    /// Verifier that always sends the given pad
    pub fn with_pad(pad: OneTimePad) -> Self {
        Self {
            pad: PadSource::Fixed(pad),
        }
    }

    /// Prove `shares` are valid by minting and revoking a root token
    pub async fn verify<C>(&self, client: &C, shares: &[Share]) -> Result<()>
    where
        C: SealStatusClient + ?Sized,
    {
        info!("Verifying unseal keys via root token generation");

        let pad = match &self.pad {
            PadSource::Remote => None,
            PadSource::RandomLegacy => Some(OneTimePad::generate()),
            PadSource::Fixed(pad) => Some(pad.clone()),
        };

        // A failed init may mean another ceremony is running; it is not ours to cancel
        let started = match client
            .init_root_generation(pad.as_ref().map(OneTimePad::as_str))
            .await
        {
            Ok(started) => started,
            Err(e) => {
                warn!("Could not start root token ceremony: {}", e);
                return Err(e.into());
            }
        };

        match self.finish_ceremony(client, shares, started, pad.as_ref()).await {
            Ok(()) => {
                info!("Root token generated and revoked, unseal keys verified");
                Ok(())
            }
            Err(e) => {
                warn!("Root token ceremony aborted: {}", e);
                if let Err(cancel_err) = client.cancel_root_generation().await {
                    warn!("Failed to cancel root token ceremony: {}", cancel_err);
                }
                Err(e)
            }
        }
    }

    async fn finish_ceremony<C>(
        &self,
        client: &C,
        shares: &[Share],
        started: RootGenerationStatus,
        pad: Option<&OneTimePad>,
    ) -> Result<()>
    where
        C: SealStatusClient + ?Sized,
    {
        let otp: Zeroizing<String> = match (started.otp, pad) {
            (Some(server_otp), _) if !server_otp.is_empty() => Zeroizing::new(server_otp),
            (_, Some(pad)) => Zeroizing::new(pad.as_str().to_string()),
            _ => {
                return Err(UnsealError::Verification(
                    "remote did not return a one-time pad".to_string(),
                ))
            }
        };

        let mut nonce = started.nonce;
        let mut encoded = None;

        for (num, share) in shares.iter().enumerate() {
            let status = client.update_root_generation(share, &nonce).await?;
            debug!(
                "Root generation progress {}/{} after key #{}",
                status.progress,
                status.required,
                num + 1
            );

            if !status.nonce.is_empty() {
                nonce = status.nonce;
            }
            if status.complete {
                encoded = status.encoded_token;
                break;
            }
        }

        let encoded = encoded.ok_or_else(|| {
            UnsealError::Verification(format!(
                "ceremony did not complete after {} key(s)",
                shares.len()
            ))
        })?;

        let token = decode_token(&encoded, &otp)?;
        client.revoke_self(&token).await?;

        Ok(())
    }
}
