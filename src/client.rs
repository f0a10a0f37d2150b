//! Read and write operations against the poker application.

use std::sync::Arc;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tracing::debug;

use crate::{
    ack::{Ack, extract_ack_from_response},
    actions::{TranslatedAction, UiAction, translate},
    bootstrap::{BootstrapError, Connection},
    mapper::{map_table_to_ui, map_tournament_to_ui},
    transport::{GraphQlRequest, Transport, TransportError},
    view::{TableView, TournamentSummary},
    wire::{TableId, TournamentConfig, TournamentId, WireAction, WireTable, WireTournament},
};

const TABLE_FIELDS: &str = "tableId name maxSeats smallBlind bigBlind ante street dealerButton \
    totalPot board { rank suit } players { playerId displayName seatIndex stack currentBet status \
    holeCards { rank suit } } handInProgress currentActorSeat";

const TOURNAMENT_FIELDS: &str =
    "tournamentId name status currentLevel playersRegistered tablesRunning";

#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum ClientError {
    #[error("could not connect to the poker service: {0}")]
    Bootstrap(#[from] BootstrapError),

    #[error("{0}")]
    Transport(#[from] TransportError),

    #[error("{message}")]
    Rejected {
        operation: &'static str,
        message: String,
    },

    #[error("table not found: {0}")]
    TableNotFound(TableId),

    #[error("tournament not found: {0}")]
    TournamentNotFound(TournamentId),

    #[error("could not encode request variables: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A mutation and the names its acknowledgement may come back under.
struct Mutation {
    field: &'static str,
    alias: &'static str,
    operation: &'static str,
    document: &'static str,
}

const CREATE_TABLE: Mutation = Mutation {
    field: "createTable",
    alias: "create_table",
    operation: "CreateTable",
    document: "mutation CreateTable($tableId: String!, $name: String!, $maxSeats: Int!, \
        $smallBlind: Int!, $bigBlind: Int!, $ante: Int!) { createTable(tableId: $tableId, \
        name: $name, maxSeats: $maxSeats, smallBlind: $smallBlind, bigBlind: $bigBlind, ante: $ante) }",
};

const SEAT_PLAYER: Mutation = Mutation {
    field: "seatPlayer",
    alias: "seat_player",
    operation: "SeatPlayer",
    document: "mutation SeatPlayer($tableId: String!, $playerId: Int!, $displayName: String!, \
        $seatIndex: Int!, $initialStack: Int!) { seatPlayer(tableId: $tableId, playerId: $playerId, \
        displayName: $displayName, seatIndex: $seatIndex, initialStack: $initialStack) }",
};

const UNSEAT_PLAYER: Mutation = Mutation {
    field: "unseatPlayer",
    alias: "unseat_player",
    operation: "UnseatPlayer",
    document: "mutation UnseatPlayer($tableId: String!, $playerId: Int!) { \
        unseatPlayer(tableId: $tableId, playerId: $playerId) }",
};

const ADJUST_STACK: Mutation = Mutation {
    field: "adjustStack",
    alias: "adjust_stack",
    operation: "AdjustStack",
    document: "mutation AdjustStack($tableId: String!, $playerId: Int!, $delta: Int!) { \
        adjustStack(tableId: $tableId, playerId: $playerId, delta: $delta) }",
};

const START_HAND: Mutation = Mutation {
    field: "startHand",
    alias: "start_hand",
    operation: "StartHand",
    document: "mutation StartHand($tableId: String!) { startHand(tableId: $tableId) }",
};

const PLAYER_ACTION: Mutation = Mutation {
    field: "playerAction",
    alias: "player_action",
    operation: "PlayerAction",
    document: "mutation PlayerAction($tableId: String!, $action: String!, $amount: Int) { \
        playerAction(tableId: $tableId, action: $action, amount: $amount) }",
};

const TICK_TABLE: Mutation = Mutation {
    field: "tickTable",
    alias: "tick_table",
    operation: "TickTable",
    document: "mutation TickTable($tableId: String!, $deltaSecs: Int!) { \
        tickTable(tableId: $tableId, deltaSecs: $deltaSecs) }",
};

const CREATE_TOURNAMENT: Mutation = Mutation {
    field: "createTournament",
    alias: "create_tournament",
    operation: "CreateTournament",
    document: "mutation CreateTournament($tournamentId: String!, $config: TournamentConfigInput!) { \
        createTournament(tournamentId: $tournamentId, config: $config) }",
};

const REGISTER_PLAYER: Mutation = Mutation {
    field: "registerPlayerToTournament",
    alias: "register_player_to_tournament",
    operation: "RegisterPlayerToTournament",
    document: "mutation RegisterPlayerToTournament($tournamentId: String!, $playerId: Int!, \
        $displayName: String!) { registerPlayerToTournament(tournamentId: $tournamentId, \
        playerId: $playerId, displayName: $displayName) }",
};

const UNREGISTER_PLAYER: Mutation = Mutation {
    field: "unregisterPlayerFromTournament",
    alias: "unregister_player_from_tournament",
    operation: "UnregisterPlayerFromTournament",
    document: "mutation UnregisterPlayerFromTournament($tournamentId: String!, $playerId: Int!) { \
        unregisterPlayerFromTournament(tournamentId: $tournamentId, playerId: $playerId) }",
};

const START_TOURNAMENT: Mutation = Mutation {
    field: "startTournament",
    alias: "start_tournament",
    operation: "StartTournament",
    document: "mutation StartTournament($tournamentId: String!) { \
        startTournament(tournamentId: $tournamentId) }",
};

const ADVANCE_LEVEL: Mutation = Mutation {
    field: "advanceTournamentLevel",
    alias: "advance_tournament_level",
    operation: "AdvanceTournamentLevel",
    document: "mutation AdvanceTournamentLevel($tournamentId: String!) { \
        advanceTournamentLevel(tournamentId: $tournamentId) }",
};

const CLOSE_TOURNAMENT: Mutation = Mutation {
    field: "closeTournament",
    alias: "close_tournament",
    operation: "CloseTournament",
    document: "mutation CloseTournament($tournamentId: String!) { \
        closeTournament(tournamentId: $tournamentId) }",
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTable {
    pub table_id: TableId,
    pub name: String,
    pub max_seats: u8,
    pub small_blind: u64,
    pub big_blind: u64,
    #[serde(default)]
    pub ante: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatRequest {
    pub player_id: u64,
    pub display_name: String,
    pub seat_index: u8,
    pub initial_stack: u64,
}

#[derive(Deserialize)]
struct TableData {
    table: Option<WireTable>,
}

#[derive(Deserialize)]
struct TablesData {
    tables: Vec<WireTable>,
}

#[derive(Deserialize)]
struct TournamentsData {
    tournaments: Vec<WireTournament>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TournamentData {
    tournament_by_id: Option<WireTournament>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TournamentTablesData {
    tournament_tables: Vec<WireTable>,
}

#[derive(Deserialize)]
struct SummaryData {
    summary: Value,
}

#[derive(Debug, Clone)]
pub struct PokerClient {
    connection: Arc<Connection>,
}

impl PokerClient {
    #[must_use]
    pub fn new(connection: Arc<Connection>) -> Self {
        Self { connection }
    }

    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    async fn transport(&self) -> Result<Transport, ClientError> {
        Ok(Transport::new(self.connection.handle().await?))
    }

    async fn query<T: DeserializeOwned>(
        &self,
        operation: &str,
        document: String,
        variables: Option<Value>,
    ) -> Result<T, ClientError> {
        let mut request = GraphQlRequest::new(document).operation_name(operation);
        if let Some(variables) = variables {
            request = request.variables(variables);
        }
        Ok(self.transport().await?.request(&request).await?)
    }

    async fn mutate(&self, mutation: &Mutation, variables: Value) -> Result<Ack, ClientError> {
        let request = GraphQlRequest::new(mutation.document)
            .variables(variables)
            .operation_name(mutation.operation);
        let data = self.transport().await?.send(&request).await?;
        let ack = extract_ack_from_response(&data, &[mutation.field, mutation.alias], mutation.field);
        if !ack.ok {
            let message = if ack.message.is_empty() {
                format!("{} failed", mutation.operation)
            } else {
                ack.message
            };
            return Err(ClientError::Rejected {
                operation: mutation.operation,
                message,
            });
        }
        debug!(operation = mutation.operation, ack_message = %ack.message, "mutation acknowledged");
        Ok(ack)
    }

    pub async fn table(&self, table_id: &TableId, viewer_id: &str) -> Result<TableView, ClientError> {
        let data: TableData = self
            .query(
                "Table",
                format!("query Table($tableId: String!) {{ table(tableId: $tableId) {{ {TABLE_FIELDS} }} }}"),
                Some(json!({ "tableId": table_id })),
            )
            .await?;
        let table = data
            .table
            .ok_or_else(|| ClientError::TableNotFound(table_id.clone()))?;
        Ok(map_table_to_ui(&table, viewer_id))
    }

    pub async fn tables(&self, viewer_id: &str) -> Result<Vec<TableView>, ClientError> {
        let data: TablesData = self
            .query("Tables", format!("query Tables {{ tables {{ {TABLE_FIELDS} }} }}"), None)
            .await?;
        Ok(data
            .tables
            .iter()
            .map(|t| map_table_to_ui(t, viewer_id))
            .collect())
    }

    pub async fn tournaments(&self) -> Result<Vec<TournamentSummary>, ClientError> {
        let data: TournamentsData = self
            .query(
                "Tournaments",
                format!("query Tournaments {{ tournaments {{ {TOURNAMENT_FIELDS} }} }}"),
                None,
            )
            .await?;
        Ok(data.tournaments.iter().map(map_tournament_to_ui).collect())
    }

    pub async fn tournament_by_id(
        &self,
        tournament_id: &TournamentId,
    ) -> Result<TournamentSummary, ClientError> {
        let data: TournamentData = self
            .query(
                "TournamentById",
                format!(
                    "query TournamentById($tournamentId: String!) {{ \
                     tournamentById(tournamentId: $tournamentId) {{ {TOURNAMENT_FIELDS} }} }}"
                ),
                Some(json!({ "tournamentId": tournament_id })),
            )
            .await?;
        let tournament = data
            .tournament_by_id
            .ok_or_else(|| ClientError::TournamentNotFound(tournament_id.clone()))?;
        Ok(map_tournament_to_ui(&tournament))
    }

    pub async fn tournament_tables(
        &self,
        tournament_id: &TournamentId,
        viewer_id: &str,
    ) -> Result<Vec<TableView>, ClientError> {
        let data: TournamentTablesData = self
            .query(
                "TournamentTables",
                format!(
                    "query TournamentTables($tournamentId: String!) {{ \
                     tournamentTables(tournamentId: $tournamentId) {{ {TABLE_FIELDS} }} }}"
                ),
                Some(json!({ "tournamentId": tournament_id })),
            )
            .await?;
        Ok(data
            .tournament_tables
            .iter()
            .map(|t| map_table_to_ui(t, viewer_id))
            .collect())
    }

    pub async fn summary(&self) -> Result<Value, ClientError> {
        let data: SummaryData = self
            .query("Summary", "query Summary { summary }".to_string(), None)
            .await?;
        Ok(data.summary)
    }

    pub async fn create_table(&self, table: &NewTable) -> Result<Ack, ClientError> {
        self.mutate(&CREATE_TABLE, serde_json::to_value(table)?).await
    }

    pub async fn seat_player(&self, table_id: &TableId, seat: &SeatRequest) -> Result<Ack, ClientError> {
        let mut variables = serde_json::to_value(seat)?;
        variables["tableId"] = json!(table_id);
        self.mutate(&SEAT_PLAYER, variables).await
    }

    pub async fn unseat_player(&self, table_id: &TableId, player_id: u64) -> Result<Ack, ClientError> {
        self.mutate(
            &UNSEAT_PLAYER,
            json!({ "tableId": table_id, "playerId": player_id }),
        )
        .await
    }

    pub async fn adjust_stack(
        &self,
        table_id: &TableId,
        player_id: u64,
        delta: i64,
    ) -> Result<Ack, ClientError> {
        self.mutate(
            &ADJUST_STACK,
            json!({ "tableId": table_id, "playerId": player_id, "delta": delta }),
        )
        .await
    }

    pub async fn start_hand(&self, table_id: &TableId) -> Result<Ack, ClientError> {
        self.mutate(&START_HAND, json!({ "tableId": table_id })).await
    }

    pub async fn player_action(
        &self,
        table_id: &TableId,
        action: WireAction,
        amount: Option<u64>,
    ) -> Result<Ack, ClientError> {
        self.mutate(
            &PLAYER_ACTION,
            json!({ "tableId": table_id, "action": action, "amount": amount }),
        )
        .await
    }

    pub async fn tick_table(&self, table_id: &TableId, delta_secs: u64) -> Result<Ack, ClientError> {
        self.mutate(
            &TICK_TABLE,
            json!({ "tableId": table_id, "deltaSecs": delta_secs }),
        )
        .await
    }

    pub async fn create_tournament(
        &self,
        tournament_id: &TournamentId,
        config: &TournamentConfig,
    ) -> Result<Ack, ClientError> {
        self.mutate(
            &CREATE_TOURNAMENT,
            json!({ "tournamentId": tournament_id, "config": config }),
        )
        .await
    }

    pub async fn register_player_to_tournament(
        &self,
        tournament_id: &TournamentId,
        player_id: u64,
        display_name: &str,
    ) -> Result<Ack, ClientError> {
        self.mutate(
            &REGISTER_PLAYER,
            json!({
                "tournamentId": tournament_id,
                "playerId": player_id,
                "displayName": display_name,
            }),
        )
        .await
    }

    pub async fn unregister_player_from_tournament(
        &self,
        tournament_id: &TournamentId,
        player_id: u64,
    ) -> Result<Ack, ClientError> {
        self.mutate(
            &UNREGISTER_PLAYER,
            json!({ "tournamentId": tournament_id, "playerId": player_id }),
        )
        .await
    }

    pub async fn start_tournament(&self, tournament_id: &TournamentId) -> Result<Ack, ClientError> {
        self.mutate(&START_TOURNAMENT, json!({ "tournamentId": tournament_id }))
            .await
    }

    pub async fn advance_tournament_level(
        &self,
        tournament_id: &TournamentId,
    ) -> Result<Ack, ClientError> {
        self.mutate(&ADVANCE_LEVEL, json!({ "tournamentId": tournament_id }))
            .await
    }

    pub async fn close_tournament(&self, tournament_id: &TournamentId) -> Result<Ack, ClientError> {
        self.mutate(&CLOSE_TOURNAMENT, json!({ "tournamentId": tournament_id }))
            .await
    }

    /// Submit a UI gesture, wait for the acknowledgement, then refetch the
    /// table so the caller renders the state that follows the action.
    pub async fn act(
        &self,
        table_id: &TableId,
        intent: UiAction,
        current_bet: u64,
        amount_input: &str,
        viewer_id: &str,
    ) -> Result<TableView, ClientError> {
        let TranslatedAction { action, amount } = translate(intent, current_bet, amount_input);
        debug!(%table_id, ?intent, %action, ?amount, "submitting player action");
        self.player_action(table_id, action, amount).await?;
        self.table(table_id, viewer_id).await
    }
}
