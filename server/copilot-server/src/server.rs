use crate::auth::{PasswordService, TokenService};
use crate::config::AppConfig;
use crate::services::{ConsultationManager, PatientResolver};
use anyhow::{Context, Result};
use database_layer::{
    bootstrap, ConsultationRepository, DatabasePool, InMemoryDatabase, NewUser,
    PatientRepository, PgConsultationRepository, PgPatientRepository, PgUserRepository,
    QueryCache, User, UserRepository,
};
use diagnosis_service::{DiagnosisProvider, GeminiClient};
use ehr_document::EhrGenerator;
use std::sync::Arc;
use tracing::{info, warn};
use voice_recognition_service::{AssemblyAiClient, TranscriptionProvider};

/// Stored for the demo account; never parses as a password hash
const DISABLED_PASSWORD_HASH: &str = "!disabled";
const ANONYMOUS_USER_NAME: &str = "Demo Doctor";

/// Who a request without a valid token acts as
#[derive(Debug, Clone, PartialEq)]
pub enum AnonymousAccess {
    Denied,
    Allowed { user_id: i32, email: String },
}

/// Shared application state handed to every handler
#[derive(Clone)]
pub struct CopilotServer {
    pub users: Arc<dyn UserRepository>,
    pub patients: Arc<dyn PatientRepository>,
    pub consultations: Arc<dyn ConsultationRepository>,
    /// `None` when running on in-memory storage
    pub database: Option<DatabasePool>,
    pub transcriber: Arc<dyn TranscriptionProvider>,
    /// `None` disables every AI feature
    pub diagnosis: Option<Arc<dyn DiagnosisProvider>>,
    pub ehr: Arc<EhrGenerator>,
    pub cache: Arc<QueryCache>,
    pub tokens: TokenService,
    pub passwords: PasswordService,
    pub anonymous: AnonymousAccess,
    pub max_upload_bytes: usize,
    pub cors_allowed_origins: Vec<String>,
    pub manager: ConsultationManager,
}

/// Pieces the server is assembled from; tests build these by hand
pub struct ServerComponents {
    pub users: Arc<dyn UserRepository>,
    pub patients: Arc<dyn PatientRepository>,
    pub consultations: Arc<dyn ConsultationRepository>,
    pub database: Option<DatabasePool>,
    pub transcriber: Arc<dyn TranscriptionProvider>,
    pub diagnosis: Option<Arc<dyn DiagnosisProvider>>,
    pub cache: Arc<QueryCache>,
    pub tokens: TokenService,
    pub anonymous: AnonymousAccess,
    pub max_upload_bytes: usize,
    pub cors_allowed_origins: Vec<String>,
}

impl CopilotServer {
    pub fn new(components: ServerComponents) -> Result<Self> {
        let ehr = Arc::new(EhrGenerator::new().context("Failed to load EHR templates")?);
        let manager = ConsultationManager::new(
            components.patients.clone(),
            components.consultations.clone(),
            components.diagnosis.clone(),
            ehr.clone(),
            components.cache.clone(),
        );

        Ok(Self {
            users: components.users,
            patients: components.patients,
            consultations: components.consultations,
            database: components.database,
            transcriber: components.transcriber,
            diagnosis: components.diagnosis,
            ehr,
            cache: components.cache,
            tokens: components.tokens,
            passwords: PasswordService::new()?,
            anonymous: components.anonymous,
            max_upload_bytes: components.max_upload_bytes,
            cors_allowed_origins: components.cors_allowed_origins,
            manager,
        })
    }

    /// Build the server from configuration: connect and bootstrap Postgres
    /// (or use in-memory storage), construct provider clients and provision
    /// the demo user when anonymous access is enabled.
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let (users, patients, consultations, database): (
            Arc<dyn UserRepository>,
            Arc<dyn PatientRepository>,
            Arc<dyn ConsultationRepository>,
            Option<DatabasePool>,
        ) = match config.database_url.as_deref() {
            Some(url) => {
                let db = DatabasePool::new(url, config.database_max_connections)
                    .await
                    .context("Failed to connect to database")?;
                bootstrap(&db).await.context("Schema bootstrap failed")?;
                info!("Database schema ready");
                let users: Arc<dyn UserRepository> = Arc::new(PgUserRepository::new(db.clone()));
                let patients: Arc<dyn PatientRepository> =
                    Arc::new(PgPatientRepository::new(db.clone()));
                let consultations: Arc<dyn ConsultationRepository> =
                    Arc::new(PgConsultationRepository::new(db.clone()));
                (users, patients, consultations, Some(db))
            }
            None => {
                warn!("Running on in-memory storage; data is lost on exit");
                let memory = Arc::new(InMemoryDatabase::new());
                let users: Arc<dyn UserRepository> = memory.clone();
                let patients: Arc<dyn PatientRepository> = memory.clone();
                let consultations: Arc<dyn ConsultationRepository> = memory;
                (users, patients, consultations, None)
            }
        };

        let transcriber: Arc<dyn TranscriptionProvider> = Arc::new(
            AssemblyAiClient::new(config.assemblyai.clone())
                .context("Invalid AssemblyAI configuration")?,
        );

        let diagnosis: Option<Arc<dyn DiagnosisProvider>> = match config.gemini.clone() {
            Some(gemini) => {
                let client = GeminiClient::new(gemini).context("Invalid Gemini configuration")?;
                info!(model = %client.model(), "Diagnosis enrichment enabled");
                Some(Arc::new(client))
            }
            None => {
                info!("GEMINI_API_KEY not set, diagnosis enrichment disabled");
                None
            }
        };

        let anonymous = if config.allow_anonymous {
            let user = ensure_anonymous_user(users.as_ref(), &config.anonymous_user_email).await?;
            AnonymousAccess::Allowed {
                user_id: user.id,
                email: user.email,
            }
        } else {
            AnonymousAccess::Denied
        };

        Self::new(ServerComponents {
            users,
            patients,
            consultations,
            database,
            transcriber,
            diagnosis,
            cache: Arc::new(QueryCache::new(config.query_cache_ttl)),
            tokens: TokenService::new(&config.jwt_secret, config.jwt_ttl_seconds),
            anonymous,
            max_upload_bytes: config.max_upload_bytes,
            cors_allowed_origins: config.cors_allowed_origins.clone(),
        })
    }

    pub fn resolver(&self) -> &PatientResolver {
        self.manager.resolver()
    }

    pub fn diagnosis_enabled(&self) -> bool {
        self.diagnosis.is_some()
    }
}

/// Find or create the account anonymous requests act as. The account has no
/// usable password, so nobody can log in as it.
pub async fn ensure_anonymous_user(users: &dyn UserRepository, email: &str) -> Result<User> {
    if let Some(user) = users.find_by_email(email).await? {
        return Ok(user);
    }

    let new_user = NewUser {
        email: email.to_string(),
        password_hash: DISABLED_PASSWORD_HASH.to_string(),
        name: ANONYMOUS_USER_NAME.to_string(),
    };
    match users.create_user(&new_user).await {
        Ok(user) => {
            info!(user_id = user.id, "Demo user provisioned");
            Ok(user)
        }
        Err(e) if e.is_unique_violation() => users
            .find_by_email(email)
            .await?
            .context("Demo user vanished after unique violation"),
        Err(e) => Err(e.into()),
    }
}
