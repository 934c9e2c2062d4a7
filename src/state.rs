use sea_orm::DatabaseConnection;

use crate::services::file_service::FileStorage;

#[derive(Clone)]
pub struct AppState {
    pub orm: DatabaseConnection,
    pub storage: FileStorage,
}
