//! User DTOs - Data Transfer Objects per utenti

use crate::entities::User;
use serde::{Deserialize, Serialize};

// struct per gestire io col client
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UserDTO {
    pub id: Option<i32>,
    pub name: Option<String>,
    pub email: Option<String>,
}

impl From<User> for UserDTO {
    fn from(value: User) -> Self {
        Self {
            id: Some(value.user_id),
            name: Some(value.name),
            email: Some(value.email),
            // la password non viene mai esposta al client!!!
        }
    }
}

/// DTO per creare un nuovo utente (senza user_id, password già hashata)
#[derive(Debug, Clone)]
pub struct CreateUserDTO {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// DTO per il login (email e password)
#[derive(Serialize, Deserialize, Debug)]
pub struct LoginDTO {
    pub email: String,
    pub password: String,
}
