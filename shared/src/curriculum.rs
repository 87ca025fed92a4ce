//! Curriculum operations shared by the HTTP, MCP and webhook Lambdas.

use aws_sdk_dynamodb::Client as DynamoClient;
use aws_sdk_ssm::Client as SsmClient;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::assistant::{self, prompts, AssistantClient};
use crate::canva::{CanvaClient, DesignOutcome, ExportResult};
use crate::catalog::{self, ActivityFilter};
use crate::comments::{self, CommentIntent};
use crate::config::Config;
use crate::feedback::{self, FeedbackAnalysis, FeedbackRecord, FeedbackRequest};
use crate::models::{Activity, Card, CanvaDesignRef, LessonPlan, LessonRequest, SaveLessonPlanResponse, SavedLessonPlan};
use crate::resources::{self, BusinessContext, ComprehensiveResources, DriveClient, DriveFile};
use crate::secrets::Credentials;
use crate::slides::{self, PresentationSource, Slide, SourceActivity};
use crate::store::{FeedbackStore, LessonPlanStore};
use crate::trello::{self, BoardStructure, TrelloClient};
use crate::{assembler, parser, Error, Result};

/// Plans considered by a bulk Trello sync.
const SYNC_LIMIT: i32 = 50;

/// Result of mirroring one plan to Trello.
#[derive(Debug, Clone, Serialize)]
pub struct SyncedPlan {
    pub plan_id: String,
    pub card_id: String,
    pub card_url: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncDetails {
    pub synced: Vec<SyncedPlan>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub total_plans: usize,
    pub synced_count: usize,
    pub error_count: usize,
    pub details: SyncDetails,
}

/// Which services have credentials.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub trello: bool,
    pub openai: bool,
    pub google_drive: bool,
    pub lesson_storage: bool,
    pub feedback_storage: bool,
}

/// What the webhook did with a board event.
#[derive(Debug, Clone, PartialEq)]
pub enum BoardReaction {
    Replied,
    FeedbackRecorded { feedback_id: String },
    ChecklistAdded,
    Ignored,
}

/// Everything a curriculum Lambda needs, built once per cold start.
pub struct CurriculumService {
    config: Config,
    credentials: Credentials,
    http: reqwest::Client,
    ssm: SsmClient,
    dynamo: DynamoClient,
}

impl CurriculumService {
    pub fn new(config: Config, credentials: Credentials, http: reqwest::Client, ssm: SsmClient, dynamo: DynamoClient) -> Self {
        Self {
            config,
            credentials,
            http,
            ssm,
            dynamo,
        }
    }

    /// Load configuration, AWS clients and credentials from the environment.
    pub async fn from_env() -> Result<Self> {
        let config = Config::from_env()?;
        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let ssm = SsmClient::new(&aws_config);
        let dynamo = DynamoClient::new(&aws_config);
        let credentials = Credentials::load(&ssm).await;
        info!(credentials = ?credentials, "Curriculum service initialized");
        Ok(Self::new(config, credentials, reqwest::Client::new(), ssm, dynamo))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn ssm(&self) -> &SsmClient {
        &self.ssm
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn status(&self) -> ServiceStatus {
        ServiceStatus {
            trello: self.credentials.trello_ready(),
            openai: self.credentials.openai_ready(),
            google_drive: self.credentials.google_drive_api_key.is_some()
                && self.config.google_drive_folder_id.is_some(),
            lesson_storage: self.config.lesson_table.is_some(),
            feedback_storage: self.config.feedback_table.is_some(),
        }
    }

    pub fn trello(&self) -> Result<TrelloClient> {
        match (&self.credentials.trello_api_key, &self.credentials.trello_token) {
            (Some(key), Some(token)) => Ok(TrelloClient::new(self.http.clone(), key, token)),
            _ => Err(Error::Config("Trello credentials not configured".to_string())),
        }
    }

    pub fn assistant(&self) -> Result<AssistantClient> {
        let key = self
            .credentials
            .openai_api_key
            .as_ref()
            .ok_or_else(|| Error::Config("OpenAI API key not configured".to_string()))?;
        Ok(AssistantClient::new(self.http.clone(), key, &self.config.openai_model))
    }

    fn lesson_store(&self) -> Result<LessonPlanStore> {
        LessonPlanStore::from_config(self.dynamo.clone(), &self.config)
    }

    fn feedback_store(&self) -> Result<FeedbackStore> {
        FeedbackStore::from_config(self.dynamo.clone(), &self.config)
    }

    fn drive(&self) -> Result<DriveClient> {
        DriveClient::configured(
            self.http.clone(),
            self.credentials.google_drive_api_key.clone(),
            self.config.google_drive_folder_id.clone(),
        )
    }

    /// Current snapshot of the activity board, parsed.
    pub async fn all_activities(&self) -> Result<Vec<Activity>> {
        let cards = self.trello()?.board_cards(&self.config.trello_board_id).await?;
        let activities = parser::parse_cards(&cards);
        info!(count = activities.len(), "Activities loaded from board");
        Ok(activities)
    }

    pub async fn activities(&self, filter: &ActivityFilter) -> Result<Vec<Activity>> {
        Ok(filter.apply(self.all_activities().await?))
    }

    pub async fn search_activities(&self, query: &str) -> Result<Vec<Activity>> {
        Ok(catalog::search(self.all_activities().await?, query))
    }

    pub async fn suggest_lesson_plan(&self, request: &LessonRequest) -> Result<LessonPlan> {
        let pool = self.all_activities().await?;
        let plan = assembler::assemble(&pool, request)?;
        info!(
            level = %plan.level,
            main = plan.structure.main_activities.len(),
            estimated = plan.estimated_duration_minutes,
            "Lesson plan assembled"
        );
        Ok(plan)
    }

    pub async fn board_structure(&self) -> Result<BoardStructure> {
        self.trello()?.board_structure(&self.config.trello_board_id).await
    }

    pub async fn drive_resources(&self, query: Option<&str>) -> Result<Vec<DriveFile>> {
        self.drive()?.list_files(query).await
    }

    pub async fn business_context(&self) -> BusinessContext {
        BusinessContext::new(&self.config.business_name, &self.config.business_website)
            .probe_website(&self.http)
            .await
    }

    pub async fn comprehensive_resources(&self, topic: Option<&str>) -> Result<ComprehensiveResources> {
        let activities = match topic {
            Some(topic) => self.search_activities(topic).await?,
            None => self.all_activities().await?,
        };
        let drive = self.drive_resources(topic).await;
        if let Err(e) = &drive {
            warn!(error = %e, "Drive resources unavailable");
        }
        let business = self.business_context().await;
        Ok(resources::summarize(topic, activities, drive, business, chrono::Utc::now()))
    }

    /// Mirror a stored plan onto the lesson plans board.
    async fn create_lesson_plan_card(&self, plan: &Value, plan_id: &str) -> Result<Option<Card>> {
        let Some(list_id) = self
            .config
            .active_list_id
            .as_deref()
            .filter(|_| self.config.lesson_plan_cards_enabled())
        else {
            return Ok(None);
        };
        let card = self
            .trello()?
            .create_card(
                list_id,
                &trello::lesson_plan_card_title(plan),
                &trello::lesson_plan_card_description(plan, plan_id),
            )
            .await?;
        info!(plan_id, card_id = %card.id, "Lesson plan card created");
        Ok(Some(card))
    }

    pub async fn save_lesson_plan(&self, lesson_plan: Value, plan_id: Option<String>) -> Result<SaveLessonPlanResponse> {
        let store = self.lesson_store()?;
        let saved = store.save(plan_id, lesson_plan).await?;

        let card = match self.create_lesson_plan_card(&saved.lesson_plan, &saved.id).await {
            Ok(card) => card,
            Err(e) => {
                warn!(plan_id = %saved.id, error = %e, "Could not mirror lesson plan to Trello");
                None
            }
        };

        let status = if card.is_some() {
            "saved_to_dynamodb_and_trello"
        } else {
            "saved_to_dynamodb"
        };
        Ok(SaveLessonPlanResponse {
            trello_url: card.as_ref().map(|c| trello::card_url(&c.id)),
            trello_card_id: card.map(|c| c.id),
            id: saved.id,
            created_at: saved.created_at,
            status: status.to_string(),
            table_name: store.table_name().to_string(),
            lesson_plan: saved.lesson_plan,
        })
    }

    pub async fn saved_lesson_plans(&self, limit: i32) -> Result<Vec<SavedLessonPlan>> {
        self.lesson_store()?.list(limit).await
    }

    pub async fn lesson_plan(&self, plan_id: &str) -> Result<SavedLessonPlan> {
        self.lesson_store()?.get(plan_id).await
    }

    /// Create a Trello card for each recent saved plan.
    pub async fn sync_lesson_plans_to_trello(&self) -> Result<SyncReport> {
        if !self.config.lesson_plan_cards_enabled() {
            return Err(Error::Config("Trello lesson plans board not configured".to_string()));
        }
        let plans = self.saved_lesson_plans(SYNC_LIMIT).await?;
        let mut details = SyncDetails::default();

        for plan in &plans {
            match self.create_lesson_plan_card(&plan.lesson_plan, &plan.id).await {
                Ok(Some(card)) => details.synced.push(SyncedPlan {
                    plan_id: plan.id.clone(),
                    card_url: trello::card_url(&card.id),
                    card_id: card.id,
                }),
                Ok(None) => details.errors.push(format!("Failed to create card for {}", plan.id)),
                Err(e) => details.errors.push(format!("Error syncing {}: {}", plan.id, e)),
            }
        }

        info!(total = plans.len(), synced = details.synced.len(), "Lesson plans synced to Trello");
        Ok(SyncReport {
            total_plans: plans.len(),
            synced_count: details.synced.len(),
            error_count: details.errors.len(),
            details,
        })
    }

    pub async fn submit_feedback(&self, request: FeedbackRequest) -> Result<FeedbackRecord> {
        self.feedback_store()?.submit(request).await
    }

    pub async fn lesson_plan_feedback(&self, plan_id: &str) -> Result<Vec<FeedbackRecord>> {
        self.feedback_store()?.for_plan(plan_id).await
    }

    pub async fn feedback_analysis(&self) -> Result<FeedbackAnalysis> {
        let items = self.feedback_store()?.all().await?;
        Ok(feedback::analyze(&items))
    }

    /// Build a presentation from a stored plan (by id) or an inline plan.
    pub async fn create_canva_presentation(&self, plan_id: Option<&str>, plan: Option<Value>) -> Result<DesignOutcome> {
        let plan = match (plan, plan_id) {
            (Some(plan), _) => plan,
            (None, Some(id)) => self.lesson_plan(id).await?.lesson_plan,
            (None, None) => {
                return Err(Error::Validation("No lesson plan data provided".to_string()));
            }
        };

        let source = PresentationSource::from_value(&plan)?;
        let deck = slides::lesson_slides_today(&source);
        let mut canva = CanvaClient::load(self.http.clone(), self.ssm.clone()).await;
        let outcome = canva.create_design(&source.design_title(), deck).await?;

        if let (Some(id), DesignOutcome::Created { design_id, edit_url, view_url, .. }) = (plan_id, &outcome) {
            let design = CanvaDesignRef {
                design_id: design_id.clone(),
                edit_url: edit_url.clone().unwrap_or_default(),
                view_url: view_url.clone().unwrap_or_default(),
                created_at: chrono::Utc::now().to_rfc3339(),
            };
            if let Err(e) = self.lesson_store()?.attach_canva_design(id, &design).await {
                warn!(plan_id = id, error = %e, "Could not record Canva design on lesson plan");
            }
        }
        Ok(outcome)
    }

    pub async fn create_canva_activity_card(&self, activity: Value) -> Result<DesignOutcome> {
        if activity.as_object().map_or(true, |a| a.is_empty()) {
            return Err(Error::Validation("No activity data provided".to_string()));
        }
        let source: SourceActivity = serde_json::from_value(activity)
            .map_err(|e| Error::Validation(format!("Unreadable activity: {}", e)))?;
        let card = slides::activity_card(&source);
        let title = format!("Activity: {}", card.title);
        let mut canva = CanvaClient::load(self.http.clone(), self.ssm.clone()).await;
        canva.create_design(&title, vec![Slide::ActivityCard(card)]).await
    }

    pub async fn export_canva_design(&self, design_id: &str, format: &str) -> Result<ExportResult> {
        if design_id.is_empty() {
            return Err(Error::Validation("Design ID required".to_string()));
        }
        let canva = CanvaClient::load(self.http.clone(), self.ssm.clone()).await;
        canva.export_design(design_id, format).await
    }

    /// Answer an `@ai` comment on `card_id`.
    pub async fn handle_comment(&self, card_id: &str, text: &str) -> Result<BoardReaction> {
        let Some(intent) = comments::classify(text) else {
            return Ok(BoardReaction::Ignored);
        };
        let trello = self.trello()?;
        let card = trello.card(card_id).await?;

        let intent = match intent {
            CommentIntent::Feedback(fb) => match trello::plan_id_from_description(&card.desc) {
                Some(plan_id) => {
                    let record = self
                        .submit_feedback(FeedbackRequest {
                            lesson_plan_id: plan_id.clone(),
                            feedback_type: fb.feedback_type.to_string(),
                            feedback_text: fb.feedback_text,
                            rating: fb.rating,
                            source: feedback::comment_source(card_id),
                        })
                        .await?;
                    let ack = format!(
                        "📝 Thanks! Recorded your {} feedback for lesson plan {}.",
                        record.feedback_type, plan_id
                    );
                    trello.add_comment(card_id, &assistant::format_comment(&ack)).await?;
                    return Ok(BoardReaction::FeedbackRecorded {
                        feedback_id: record.feedback_id,
                    });
                }
                None => comments::classify_request(&comments::strip_mention(text)),
            },
            other => other,
        };

        let (prompt, max_tokens) = match &intent {
            CommentIntent::SuggestActivities { level, minutes } => (
                prompts::suggest_activities(level, &comments::focus_from_card(&card), *minutes),
                assistant::DEFAULT_MAX_TOKENS,
            ),
            CommentIntent::BuildLessonPlan { minutes } => {
                (prompts::lesson_plan(&card.desc, *minutes), assistant::DEFAULT_MAX_TOKENS)
            }
            CommentIntent::AnalyzeActivity => (
                prompts::analyze_activity(&card.name, &card.desc),
                assistant::ANALYSIS_MAX_TOKENS,
            ),
            CommentIntent::FindAlternatives => (
                prompts::alternatives(&card.name, &card.desc),
                assistant::ANALYSIS_MAX_TOKENS,
            ),
            CommentIntent::Question(request) => (
                prompts::general(request, &card.name, &card.desc),
                assistant::DEFAULT_MAX_TOKENS,
            ),
            // Feedback on a card that mirrors no plan is answered as a question.
            CommentIntent::Feedback(_) => (
                prompts::general(&comments::strip_mention(text), &card.name, &card.desc),
                assistant::DEFAULT_MAX_TOKENS,
            ),
        };

        let reply = self.assistant()?.complete(&prompt, max_tokens).await?;
        trello.add_comment(card_id, &assistant::format_comment(&reply)).await?;
        Ok(BoardReaction::Replied)
    }

    /// React to a card arriving in a new list.
    pub async fn handle_card_moved(&self, card_id: &str, list_name: &str) -> Result<BoardReaction> {
        if !comments::is_scheduling_move(list_name) {
            return Ok(BoardReaction::Ignored);
        }
        let trello = self.trello()?;
        trello
            .add_checklist(card_id, comments::PREPARATION_CHECKLIST_NAME, &comments::PREPARATION_ITEMS)
            .await?;
        trello.add_comment(card_id, comments::SCHEDULED_COMMENT).await?;
        Ok(BoardReaction::ChecklistAdded)
    }

    /// React to a newly created card.
    pub async fn handle_card_created(&self, card_id: &str, card_name: &str) -> Result<BoardReaction> {
        if !comments::is_lesson_builder_card(card_name) {
            return Ok(BoardReaction::Ignored);
        }
        self.trello()?
            .add_comment(card_id, comments::LESSON_BUILDER_COMMENT)
            .await?;
        Ok(BoardReaction::Replied)
    }
}
