use std::sync::Arc;

use rocket::response::stream::{Event, EventStream};
use rocket::serde::json::Json;
use rocket::{delete, get, post, put, routes, catchers, Build, Rocket, State};
use tracing::{debug, instrument};

use shared::models::*;
use shared::validation::ValidationError;

use crate::catchers::{bad_request, conflict, internal_error, not_found, too_many_requests, unprocessable};
use crate::config::Config;
use crate::coordinator::{ElectionCoordinator, VoteOutcome};
use crate::cors::Cors;
use crate::error::ApiError;
use crate::hub::Hub;
use crate::rate_limiter::RateLimiter;
use crate::realtime::{ElectionChannel, GroupChannel};
use crate::store::Page;
use crate::stores::{AccountStore, GroupStore, MealChoiceStore, RoundStore};
use crate::utils::parse_object_id;

const CREATE_ELECTION_WINDOW_MINUTES: i64 = 1;
const CREATE_ELECTION_MAX_ATTEMPTS: u32 = 5;

pub struct AppState {
    pub config: Config,
    pub groups: Arc<GroupStore>,
    pub meal_choices: Arc<MealChoiceStore>,
    pub accounts: Arc<AccountStore>,
    pub rounds: Arc<RoundStore>,
    pub coordinator: Arc<ElectionCoordinator>,
    pub election_channel: Arc<ElectionChannel>,
    pub group_channel: Arc<GroupChannel>,
    pub create_limiter: RateLimiter,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let groups = Arc::new(GroupStore::new());
        let meal_choices = Arc::new(MealChoiceStore::new());
        let accounts = Arc::new(AccountStore::new());
        let rounds = Arc::new(RoundStore::new());

        let hub = Arc::new(Hub::new());
        let coordinator = Arc::new(ElectionCoordinator::new(
            rounds.clone(),
            groups.clone(),
            meal_choices.clone(),
            accounts.clone(),
            hub.clone(),
        ));
        let election_channel = Arc::new(ElectionChannel::new(hub, coordinator.clone()));
        let group_channel = Arc::new(GroupChannel::new(Arc::new(Hub::new()), groups.clone()));

        Self {
            config,
            groups,
            meal_choices,
            accounts,
            rounds,
            coordinator,
            election_channel,
            group_channel,
            create_limiter: RateLimiter::new(
                CREATE_ELECTION_MAX_ATTEMPTS,
                CREATE_ELECTION_WINDOW_MINUTES,
            ),
        }
    }
}

pub fn app(state: AppState) -> Rocket<Build> {
    let cors = Cors {
        allowed_origin: state.config.allowed_origin.clone(),
    };

    rocket::build()
        .attach(cors)
        .manage(state)
        .mount(
            "/api",
            routes![
                list_elections,
                get_election,
                create_election,
                update_election,
                delete_election,
                start_election,
                advance_election,
                close_election,
                stop_election,
                cast_vote,
                election_events,
                list_rounds,
                get_round,
                create_round,
                update_round,
                delete_round,
                list_groups,
                group_count,
                get_group,
                create_group,
                delete_group,
                list_meal_choices,
                create_meal_choice,
                list_accounts,
                create_account,
                all_options,
            ],
        )
        .register(
            "/",
            catchers![
                bad_request,
                not_found,
                conflict,
                unprocessable,
                too_many_requests,
                internal_error,
            ],
        )
}

#[rocket::options("/<_..>")]
pub async fn all_options() -> rocket::http::Status {
    rocket::http::Status::Ok
}

// --- elections ---

#[get("/election?<query..>")]
pub async fn list_elections(
    state: &State<AppState>,
    query: ElectionScan,
) -> Result<Json<GetAllResponse<Election>>, ApiError> {
    let elections = if query.any_filter() {
        debug!("Scanning elections: {:?}", query);
        state.coordinator.scan(&query, Page::default())?
    } else {
        state.coordinator.list(Page::default())?
    };
    Ok(Json(GetAllResponse::new(elections)))
}

#[get("/election/<id>")]
pub async fn get_election(state: &State<AppState>, id: &str) -> Result<Json<Election>, ApiError> {
    let id = parse_object_id(id)?;
    Ok(Json(state.coordinator.get(&id)?))
}

#[instrument(skip(state, request))]
#[post("/election", format = "json", data = "<request>")]
pub async fn create_election(
    state: &State<AppState>,
    request: Json<CreateElectionRequest>,
) -> Result<Json<Election>, ApiError> {
    let request = request.into_inner();

    let rate_limit_key = format!("create_election:{}", request.group_id);
    state
        .create_limiter
        .check_rate_limit(&rate_limit_key)
        .map_err(ApiError::RateLimited)?;

    Ok(Json(state.coordinator.create(request)?))
}

#[put("/election", format = "json", data = "<request>")]
pub async fn update_election(
    state: &State<AppState>,
    request: Json<UpdateElectionRequest>,
) -> Result<Json<Election>, ApiError> {
    Ok(Json(state.coordinator.update(request.into_inner())?))
}

#[delete("/election/<id>")]
pub async fn delete_election(state: &State<AppState>, id: &str) -> Result<Json<Election>, ApiError> {
    let id = parse_object_id(id)?;
    Ok(Json(state.coordinator.delete(&id)?))
}

#[post("/election/<id>/start")]
pub async fn start_election(state: &State<AppState>, id: &str) -> Result<Json<Election>, ApiError> {
    let id = parse_object_id(id)?;
    Ok(Json(state.coordinator.start(&id)?))
}

#[post("/election/<id>/round", format = "json", data = "<request>")]
pub async fn advance_election(
    state: &State<AppState>,
    id: &str,
    request: Json<AdvanceRoundRequest>,
) -> Result<Json<ElectionRound>, ApiError> {
    let id = parse_object_id(id)?;
    Ok(Json(state.coordinator.advance_round(&id, request.into_inner().winner)?))
}

#[post("/election/<id>/close")]
pub async fn close_election(
    state: &State<AppState>,
    id: &str,
) -> Result<Json<ElectionRound>, ApiError> {
    let id = parse_object_id(id)?;
    Ok(Json(state.coordinator.close_round(&id)?))
}

#[post("/election/<id>/stop")]
pub async fn stop_election(state: &State<AppState>, id: &str) -> Result<Json<Election>, ApiError> {
    let id = parse_object_id(id)?;
    Ok(Json(state.coordinator.stop_halfway(&id)?))
}

#[instrument(skip(state, request), fields(election_id = %id))]
#[post("/election/<id>/vote", format = "json", data = "<request>")]
pub async fn cast_vote(
    state: &State<AppState>,
    id: &str,
    request: Json<VoteRequest>,
) -> Result<Json<VoteOutcome>, ApiError> {
    let election_id = parse_object_id(id)?;
    let request = request.into_inner();

    let outcome = state.election_channel.vote(Vote {
        election_id,
        group_id: request.group_id,
        voter_id: request.voter_id,
        candidate_id: request.candidate_id,
    })?;
    Ok(Json(outcome))
}

/// Server-sent-events bridge onto the election topic: subscribing joins,
/// dropping the stream leaves.
#[get("/election/<id>/events?<group>")]
pub async fn election_events(
    state: &State<AppState>,
    id: &str,
    group: &str,
) -> Result<EventStream![Event], ApiError> {
    let election_id = parse_object_id(id)?;
    let group_id = parse_object_id(group)?;
    let mut subscription = state.election_channel.subscribe(&election_id, &group_id)?;

    Ok(EventStream! {
        while let Some(event) = subscription.next().await {
            yield Event::json(&event);
        }
    })
}

// --- election rounds ---

#[get("/electionround")]
pub async fn list_rounds(
    state: &State<AppState>,
) -> Result<Json<GetAllResponse<ElectionRound>>, ApiError> {
    Ok(Json(GetAllResponse::new(state.rounds.list(Page::default())?)))
}

#[get("/electionround/<id>")]
pub async fn get_round(state: &State<AppState>, id: &str) -> Result<Json<ElectionRound>, ApiError> {
    let id = parse_object_id(id)?;
    state
        .rounds
        .get(&id)?
        .map(Json)
        .ok_or_else(|| shared::Error::not_found("ElectionRound").into())
}

#[post("/electionround", format = "json", data = "<request>")]
pub async fn create_round(
    state: &State<AppState>,
    request: Json<CreateRoundRequest>,
) -> Result<Json<ElectionRound>, ApiError> {
    let request = request.into_inner();
    if !state.groups.exists(&request.group_id)? {
        return Err(ValidationError::UnknownGroup.into());
    }
    Ok(Json(state.rounds.create(request)?))
}

#[put("/electionround", format = "json", data = "<request>")]
pub async fn update_round(
    state: &State<AppState>,
    request: Json<UpdateRoundRequest>,
) -> Result<Json<ElectionRound>, ApiError> {
    let request = request.into_inner();
    let existing = state
        .rounds
        .get(&request.id)?
        .ok_or_else(|| shared::Error::not_found("ElectionRound"))?;

    let updated = ElectionRound {
        id: existing.id,
        election_id: request.election_id,
        group_id: request.group_id,
        winner: request.winner,
        rounds: request.rounds,
    };
    if !state.rounds.replace(updated.clone())? {
        return Err(shared::Error::not_found("ElectionRound").into());
    }
    Ok(Json(updated))
}

#[delete("/electionround/<id>")]
pub async fn delete_round(
    state: &State<AppState>,
    id: &str,
) -> Result<Json<ElectionRound>, ApiError> {
    let id = parse_object_id(id)?;
    let existing = state
        .rounds
        .get(&id)?
        .ok_or_else(|| shared::Error::not_found("ElectionRound"))?;
    state.rounds.soft_delete(&id)?;
    Ok(Json(existing))
}

// --- peripheral plumbing ---

#[get("/group?<limit>&<offset>")]
pub async fn list_groups(
    state: &State<AppState>,
    limit: Option<i64>,
    offset: Option<i64>,
) -> Result<Json<GetAllResponse<Group>>, ApiError> {
    let groups = state.groups.list(Page::new(limit, offset))?;
    Ok(Json(GetAllResponse::new(groups)))
}

/// Answers with the count and broadcasts it to every presence client.
#[get("/group/count")]
pub async fn group_count(state: &State<AppState>) -> Result<Json<usize>, ApiError> {
    Ok(Json(state.group_channel.request_group_count()?))
}

#[get("/group/<id>")]
pub async fn get_group(state: &State<AppState>, id: &str) -> Result<Json<Group>, ApiError> {
    let id = parse_object_id(id)?;
    state
        .groups
        .get(&id)?
        .map(Json)
        .ok_or_else(|| shared::Error::not_found("Group").into())
}

#[post("/group", format = "json", data = "<request>")]
pub async fn create_group(
    state: &State<AppState>,
    request: Json<CreateGroupRequest>,
) -> Result<Json<Group>, ApiError> {
    Ok(Json(state.groups.create(request.into_inner())?))
}

#[delete("/group/<id>")]
pub async fn delete_group(state: &State<AppState>, id: &str) -> Result<Json<Group>, ApiError> {
    let id = parse_object_id(id)?;
    let existing = state
        .groups
        .get(&id)?
        .ok_or_else(|| shared::Error::not_found("Group"))?;
    state.groups.soft_delete(&id)?;
    Ok(Json(existing))
}

#[get("/mealchoice?<group>")]
pub async fn list_meal_choices(
    state: &State<AppState>,
    group: Option<&str>,
) -> Result<Json<GetAllResponse<MealChoice>>, ApiError> {
    let group_id = group.map(parse_object_id).transpose()?;
    let choices = state.meal_choices.list(Page::default(), group_id.as_ref())?;
    Ok(Json(GetAllResponse::new(choices)))
}

#[post("/mealchoice", format = "json", data = "<request>")]
pub async fn create_meal_choice(
    state: &State<AppState>,
    request: Json<CreateMealChoiceRequest>,
) -> Result<Json<MealChoice>, ApiError> {
    let request = request.into_inner();
    if !state.groups.exists(&request.group_id)? {
        return Err(ValidationError::UnknownGroup.into());
    }
    Ok(Json(state.meal_choices.create(request)?))
}

#[get("/account?<group>")]
pub async fn list_accounts(
    state: &State<AppState>,
    group: Option<&str>,
) -> Result<Json<GetAllResponse<Account>>, ApiError> {
    let group_id = group.map(parse_object_id).transpose()?;
    let accounts = state.accounts.list(Page::default(), group_id.as_ref())?;
    Ok(Json(GetAllResponse::new(accounts)))
}

#[post("/account", format = "json", data = "<request>")]
pub async fn create_account(
    state: &State<AppState>,
    request: Json<CreateAccountRequest>,
) -> Result<Json<Account>, ApiError> {
    let request = request.into_inner();
    if let Some(group_id) = &request.group_id {
        if !state.groups.exists(group_id)? {
            return Err(ValidationError::UnknownGroup.into());
        }
    }
    Ok(Json(state.accounts.create(request)?))
}
