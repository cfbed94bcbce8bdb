use super::{AuthError, Capability};
use crate::common::entity_ids::UserId;
use crate::domains::profiles::models::UserRoleRecord;
use newsdesk_shared::Role;
use sqlx::PgPool;

/// The caller of an operation, with the role it holds right now.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    user_id: UserId,
    role: Role,
}

impl Actor {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    /// Resolve the actor's current role. A missing role row means `user`.
    pub async fn load(user_id: UserId, pool: &PgPool) -> Result<Self, AuthError> {
        let role = UserRoleRecord::role_for(user_id, pool)
            .await
            .map_err(AuthError::InternalError)?;
        Ok(Self::new(user_id, role))
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn can(self, capability: Capability) -> CapabilityCheck {
        CapabilityCheck {
            actor: self,
            capability,
        }
    }
}

pub struct CapabilityCheck {
    actor: Actor,
    capability: Capability,
}

impl CapabilityCheck {
    /// Every capability currently requires the admin role.
    pub fn check(self) -> Result<Actor, AuthError> {
        if !self.actor.is_admin() {
            tracing::warn!(
                user_id = %self.actor.user_id,
                capability = self.capability.as_str(),
                "capability denied"
            );
            return Err(AuthError::AdminRequired);
        }
        Ok(self.actor)
    }
}
