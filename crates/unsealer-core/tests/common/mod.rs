//! Recording mock of the remote secret store

#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use zeroize::Zeroizing;

use unsealer_core::{
    RemoteError, RemoteResult, RootGenerationStatus, SealStatus, SealStatusClient,
};

pub const LEGACY_PAD: [u8; 16] = [
    0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18, 0x19, 0x1a, 0x1b, 0x1c, 0x1d, 0x1e, 0x1f,
];
pub const LEGACY_OTP: &str = "EBESExQVFhcYGRobHB0eHw==";
pub const LEGACY_ENCODED: &str = "miyNP1WiWH2EHMjzA2Z0Dw==";
pub const LEGACY_TOKEN: &str = "8a3d9f2c-41b7-4e6a-9c05-d2e81f7b6a10";

pub const CURRENT_OTP: &str = "Ab3dEf6hIj9kLm2nOp5qRs8tUv1";
pub const CURRENT_ENCODED: &str = "KRRASh8LcBoTMmsdLV9kGxUdDAg2NG4OMT58";
pub const CURRENT_TOKEN: &str = "hvs.ZmFrZXRva2VuZm9ydGVzdHM";

/// Every remote call the mock saw, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    SealStatus,
    Unseal(String),
    InitRoot(String),
    UpdateRoot { share: String, nonce: String },
    CancelRoot,
    RevokeSelf(String),
}

#[derive(Debug)]
pub struct MockState {
    pub sealed: bool,
    pub threshold: usize,
    pub unseal_progress: usize,
    pub status_unavailable: bool,
    pub rejected_share: Option<String>,
    pub fail_root_init: bool,
    pub fail_root_update: bool,
    pub server_otp: Option<String>,
    pub encoded_token: String,
    pub root_progress: usize,
    pub calls: Vec<Call>,
}

pub struct MockVault {
    pub state: Mutex<MockState>,
}

impl MockVault {
    pub fn new(threshold: usize, sealed: bool) -> Self {
        Self {
            state: Mutex::new(MockState {
                sealed,
                threshold,
                unseal_progress: 0,
                status_unavailable: false,
                rejected_share: None,
                fail_root_init: false,
                fail_root_update: false,
                server_otp: None,
                encoded_token: LEGACY_ENCODED.to_string(),
                root_progress: 0,
                calls: Vec::new(),
            }),
        }
    }

    pub fn set<F: FnOnce(&mut MockState)>(&self, f: F) {
        f(&mut self.state.lock().unwrap());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn unseal_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Unseal(share) => Some(share),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    fn status_of(state: &MockState) -> SealStatus {
        SealStatus {
            sealed: state.sealed,
            threshold: state.threshold,
            progress: state.unseal_progress,
        }
    }
}

#[async_trait]
impl SealStatusClient for MockVault {
    async fn seal_status(&self) -> RemoteResult<SealStatus> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::SealStatus);
        if state.status_unavailable {
            return Err(RemoteError::Unreachable("connection refused".into()));
        }
        Ok(Self::status_of(&state))
    }

    async fn submit_unseal_share(&self, share: &str) -> RemoteResult<SealStatus> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Unseal(share.to_string()));

        if state.rejected_share.as_deref() == Some(share) {
            return Err(RemoteError::Rejected {
                status: 400,
                message: "invalid key".into(),
            });
        }

        if state.sealed {
            state.unseal_progress += 1;
            if state.unseal_progress >= state.threshold {
                state.sealed = false;
                state.unseal_progress = 0;
            }
        }
        Ok(Self::status_of(&state))
    }

    async fn init_root_generation(&self, otp: Option<&str>) -> RemoteResult<RootGenerationStatus> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::InitRoot(otp.unwrap_or_default().to_string()));

        if state.fail_root_init {
            return Err(RemoteError::Rejected {
                status: 400,
                message: "root generation already in progress".into(),
            });
        }

        state.root_progress = 0;

        Ok(RootGenerationStatus {
            nonce: "nonce-1".into(),
            progress: 0,
            required: state.threshold,
            complete: false,
            encoded_token: None,
            otp: state.server_otp.clone(),
        })
    }

    async fn update_root_generation(
        &self,
        share: &str,
        nonce: &str,
    ) -> RemoteResult<RootGenerationStatus> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::UpdateRoot {
            share: share.to_string(),
            nonce: nonce.to_string(),
        });

        if state.fail_root_update {
            return Err(RemoteError::Rejected {
                status: 400,
                message: "root generation update failed".into(),
            });
        }

        state.root_progress += 1;
        let complete = state.root_progress >= state.threshold;
        Ok(RootGenerationStatus {
            nonce: nonce.to_string(),
            progress: state.root_progress,
            required: state.threshold,
            complete,
            encoded_token: complete.then(|| state.encoded_token.clone()),
            otp: None,
        })
    }

    async fn cancel_root_generation(&self) -> RemoteResult<()> {
        self.state.lock().unwrap().calls.push(Call::CancelRoot);
        Ok(())
    }

    async fn revoke_self(&self, token: &Zeroizing<String>) -> RemoteResult<()> {
        self.state
            .lock()
            .unwrap()
            .calls
            .push(Call::RevokeSelf(token.as_str().to_string()));
        Ok(())
    }
}
