use std::{fmt, sync::Arc};

use recirca_core::{LifecycleEngine, LocationRelay};

use crate::auth::resolver::CredentialResolver;
use crate::infra::config::Config;
use crate::ws::SessionRegistry;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<LifecycleEngine>,
    pub relay: Arc<LocationRelay>,
    pub registry: Arc<SessionRegistry>,
    pub auth: Arc<dyn CredentialResolver>,
    pub config: Arc<Config>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}
