//! Business logic services

pub mod catalog;
pub mod loans;
pub mod sessions;
pub mod users;

use crate::{config::AppConfig, error::AppResult, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub repository: Repository,
    pub catalog: catalog::CatalogService,
    pub loans: loans::LoansService,
    pub users: users::UsersService,
    pub sessions: sessions::SessionsService,
}

impl Services {
    /// Create all services with the given repository
    pub async fn new(repository: Repository, config: &AppConfig) -> AppResult<Self> {
        let sessions = sessions::SessionsService::new(&config.sessions).await?;

        Ok(Self {
            catalog: catalog::CatalogService::new(repository.clone(), config.catalog.clone()),
            loans: loans::LoansService::new(repository.clone(), config.catalog.clone()),
            users: users::UsersService::new(repository.clone(), config.auth.clone()),
            sessions,
            repository,
        })
    }
}
