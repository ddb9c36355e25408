//! Support ticket handlers

use axum::{extract::State, http::StatusCode, Extension};
use uuid::Uuid;

use crate::error::AppResult;
use crate::extract::{Json, Path, Query};
use crate::middleware::AuthUser;
use crate::services::realtime::{ChangeAction, Table};
use crate::services::support::{
    CreateTicketInput, SupportService, SupportTicket, TicketFilter, UpdateTicketInput,
};
use crate::AppState;

pub async fn create_ticket(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(input): Json<CreateTicketInput>,
) -> AppResult<(StatusCode, Json<SupportTicket>)> {
    let ticket = SupportService::new(state.db)
        .create(user.user_id, input)
        .await?;
    state
        .changes
        .publish(Table::SupportTickets, ChangeAction::Insert, ticket.id);
    Ok((StatusCode::CREATED, Json(ticket)))
}

/// Own tickets, or every ticket for admins
pub async fn list_tickets(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(filter): Query<TicketFilter>,
) -> AppResult<Json<Vec<SupportTicket>>> {
    let tickets = SupportService::new(state.db).list(&user, &filter).await?;
    Ok(Json(tickets))
}

/// Status change and/or reply (admin)
pub async fn update_ticket(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(ticket_id): Path<Uuid>,
    Json(input): Json<UpdateTicketInput>,
) -> AppResult<Json<SupportTicket>> {
    user.require_admin()?;
    let ticket = SupportService::new(state.db)
        .update(ticket_id, input)
        .await?;
    state
        .changes
        .publish(Table::SupportTickets, ChangeAction::Update, ticket.id);
    Ok(Json(ticket))
}
