//! REST endpoint handlers.
//!
//! Placement commands go over the bus with a `request_id` and wait for the
//! matching `PlacementOutcome`, so the placement actor stays the only code
//! that touches the engine.

use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::Utc;
use tokio::sync::broadcast;

use super::WebState;
use super::types::{
    ApiError, CompletedView, CreatePlacementRequest, PlacementResponse, PlacementView,
    PostSettingsResponse, ProximityResponse, SkillRequest, StatusResponse, UnitsQuery,
};
use crate::state::config::{FairwayConfig, generate_id};
use fairway::{
    ConfigAction, ConfigCommand, Coordinate, CourseSection, FairwayEvent, FairwayMessage,
    LocationFix, PlacementAction, PlacementCommand, PlacementState, ShotPlacement, UnitSystem,
};

/// How long a handler waits for the owning actor to answer.
const REPLY_TIMEOUT: Duration = Duration::from_secs(5);
const CONFIG_REPLY_TIMEOUT: Duration = Duration::from_secs(10);

/// Emit a placement command and wait for its outcome.
async fn placement_command(
    state: &WebState,
    action: PlacementAction,
) -> Result<Option<ShotPlacement>, ApiError> {
    let request_id = generate_id();
    // Subscribe before sending so the reply cannot slip past.
    let mut bus_rx = state.bus_tx.subscribe();
    let _ = state.bus_tx.send(
        FairwayMessage::new(PlacementCommand {
            request_id: Some(request_id.clone()),
            action,
        })
        .source(&state.actor_id),
    );

    let reply = tokio::time::timeout(REPLY_TIMEOUT, async {
        loop {
            match bus_rx.recv().await {
                Ok(msg) => {
                    if let FairwayEvent::PlacementOutcome(o) = msg.event
                        && o.request_id == request_id
                    {
                        return Some(o);
                    }
                }
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
            }
        }
    })
    .await;

    match reply {
        Ok(Some(outcome)) => match outcome.error {
            Some(e) => Err(e.into()),
            None => Ok(outcome.placement),
        },
        _ => {
            tracing::warn!("web: placement command {request_id} got no reply");
            Err(ApiError::no_reply("the placement engine"))
        }
    }
}

fn units(state: &WebState, query: &UnitsQuery) -> UnitSystem {
    query
        .units
        .as_deref()
        .and_then(UnitSystem::from_code)
        .unwrap_or_else(|| state.root.system.snapshot().default_units)
}

fn placement_response(
    state: &WebState,
    placement: Option<&ShotPlacement>,
    units: UnitSystem,
) -> PlacementResponse {
    let last_completed = state.root.round.snapshot().last_completed;
    PlacementResponse {
        state: placement.map_or(PlacementState::Inactive, |p| p.state),
        placement: placement.map(|p| PlacementView::new(p, units)),
        last_completed: last_completed.as_ref().map(|s| CompletedView::new(s, units)),
    }
}

/// Fixes from HTTP/WS clients without a capture time get "now".
pub(super) fn stamp(position: Coordinate) -> Coordinate {
    if position.captured_at_millis() == 0 {
        position.captured_at(Utc::now().timestamp_millis())
    } else {
        position
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// GET /api/status
pub async fn get_status(State(state): State<Arc<WebState>>) -> Json<StatusResponse> {
    let actors = state.actors.read().await.clone();
    let round = state.root.round.snapshot();
    Json(StatusResponse {
        actors,
        placement_state: round
            .placement
            .as_ref()
            .map_or(PlacementState::Inactive, |p| p.state),
        last_position: round.last_position,
        nearest_course: round
            .proximity
            .as_ref()
            .and_then(|r| r.nearest_course_id())
            .map(str::to_string),
    })
}

// ---------------------------------------------------------------------------
// Placement
// ---------------------------------------------------------------------------

/// GET /api/placement?units=imperial|metric
pub async fn get_placement(
    State(state): State<Arc<WebState>>,
    Query(query): Query<UnitsQuery>,
) -> Json<PlacementResponse> {
    let units = units(&state, &query);
    let placement = state.root.round.snapshot().placement;
    Json(placement_response(&state, placement.as_ref(), units))
}

/// POST /api/placement
pub async fn post_placement(
    State(state): State<Arc<WebState>>,
    Query(query): Query<UnitsQuery>,
    Json(body): Json<CreatePlacementRequest>,
) -> Result<(StatusCode, Json<PlacementResponse>), ApiError> {
    let position = body
        .position
        .map(stamp)
        .or_else(|| state.root.round.last_position())
        .ok_or_else(|| ApiError::unprocessable("no position given and no fix received yet"))?;
    let placement = placement_command(
        &state,
        PlacementAction::Create {
            target: body.target,
            pin: body.pin,
            hole_number: body.hole_number,
            position,
        },
    )
    .await?;
    let units = units(&state, &query);
    Ok((
        StatusCode::CREATED,
        Json(placement_response(&state, placement.as_ref(), units)),
    ))
}

/// POST /api/placement/activate
pub async fn post_activate(
    State(state): State<Arc<WebState>>,
    Query(query): Query<UnitsQuery>,
) -> Result<Json<PlacementResponse>, ApiError> {
    let placement = placement_command(&state, PlacementAction::Activate).await?;
    let units = units(&state, &query);
    Ok(Json(placement_response(&state, placement.as_ref(), units)))
}

/// POST /api/placement/cancel. Cancelling with nothing in flight is fine.
pub async fn post_cancel(
    State(state): State<Arc<WebState>>,
    Query(query): Query<UnitsQuery>,
) -> Result<Json<PlacementResponse>, ApiError> {
    let placement = placement_command(&state, PlacementAction::Cancel).await?;
    let units = units(&state, &query);
    Ok(Json(placement_response(&state, placement.as_ref(), units)))
}

/// POST /api/skill
pub async fn post_skill(
    State(state): State<Arc<WebState>>,
    Query(query): Query<UnitsQuery>,
    Json(body): Json<SkillRequest>,
) -> Result<Json<PlacementResponse>, ApiError> {
    let (tier, category) = body.parse()?;
    let placement =
        placement_command(&state, PlacementAction::UpdateSkillContext { tier, category }).await?;
    let units = units(&state, &query);
    Ok(Json(placement_response(&state, placement.as_ref(), units)))
}

/// POST /api/location: publish a fix as if it came from a location source.
pub async fn post_location(
    State(state): State<Arc<WebState>>,
    Json(position): Json<Coordinate>,
) -> StatusCode {
    let _ = state.bus_tx.send(
        FairwayMessage::new(LocationFix {
            position: stamp(position),
        })
        .source(&state.actor_id),
    );
    StatusCode::ACCEPTED
}

// ---------------------------------------------------------------------------
// Proximity
// ---------------------------------------------------------------------------

/// GET /api/proximity: the latest classification.
pub async fn get_proximity(State(state): State<Arc<WebState>>) -> Json<ProximityResponse> {
    let result = state.root.round.snapshot().proximity.unwrap_or_default();
    let nearest_name = result.nearest_course_id().and_then(|id| {
        state
            .root
            .system
            .snapshot()
            .course
            .get(id)
            .map(|c| c.name.clone())
    });
    Json(ProximityResponse {
        result,
        nearest_name,
    })
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// GET /api/settings: the full persisted config.
pub async fn get_settings(State(state): State<Arc<WebState>>) -> Json<FairwayConfig> {
    Json(state.root.system.snapshot())
}

/// Emit a config command and wait for the system actor's outcome.
async fn config_command(
    state: &WebState,
    action: ConfigAction,
) -> Result<Json<PostSettingsResponse>, ApiError> {
    let request_id = generate_id();
    let mut bus_rx = state.bus_tx.subscribe();
    let _ = state.bus_tx.send(
        FairwayMessage::new(ConfigCommand {
            request_id: Some(request_id.clone()),
            action,
        })
        .source(&state.actor_id),
    );

    let reply = tokio::time::timeout(CONFIG_REPLY_TIMEOUT, async {
        loop {
            match bus_rx.recv().await {
                Ok(msg) => {
                    if let FairwayEvent::ConfigOutcome(r) = msg.event
                        && r.request_id == request_id
                    {
                        return Some(r);
                    }
                }
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
            }
        }
    })
    .await;

    match reply {
        Ok(Some(r)) => Ok(Json(PostSettingsResponse {
            restarted: r.restarted,
            stopped: r.stopped,
            started: r.started,
        })),
        _ => {
            tracing::warn!("config update: timed out waiting for ConfigOutcome");
            Err(ApiError::no_reply("the system actor"))
        }
    }
}

/// POST /api/settings: replace the config via the system actor and report
/// which actors it touched.
pub async fn post_settings(
    State(state): State<Arc<WebState>>,
    Json(new_config): Json<FairwayConfig>,
) -> Result<Json<PostSettingsResponse>, ApiError> {
    config_command(&state, ConfigAction::ReplaceAll { config: new_config }).await
}

/// DELETE /api/settings/{id}: drop one section by global id ("advisor.0").
pub async fn delete_section(
    State(state): State<Arc<WebState>>,
    Path(id): Path<String>,
) -> Result<Json<PostSettingsResponse>, ApiError> {
    if !id.contains('.') {
        return Err(ApiError::unprocessable(format!(
            "'{id}' is not a section id, expected <section>.<index>"
        )));
    }
    config_command(&state, ConfigAction::Remove { id }).await
}

// ---------------------------------------------------------------------------
// Course directory
// ---------------------------------------------------------------------------

/// PUT /api/course/{id}: add or move a saved course.
pub async fn put_course(
    State(state): State<Arc<WebState>>,
    Path(id): Path<String>,
    Json(section): Json<CourseSection>,
) -> Result<Json<PostSettingsResponse>, ApiError> {
    section.anchor(&id)?;
    config_command(
        &state,
        ConfigAction::UpsertCourse {
            index: id,
            section,
        },
    )
    .await
}

/// DELETE /api/course/{id}
pub async fn delete_course(
    State(state): State<Arc<WebState>>,
    Path(id): Path<String>,
) -> Result<Json<PostSettingsResponse>, ApiError> {
    config_command(
        &state,
        ConfigAction::Remove {
            id: format!("course.{id}"),
        },
    )
    .await
}
