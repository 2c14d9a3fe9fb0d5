//! # Front Controller Module
//!
//! The single entry point of the bot. It turns one [`InboundEvent`] (command,
//! button press or free text) into the replies to show the user. It does not
//! know about Telegram; `crate::bot` adapts both directions.
//!
//! Per event the controller:
//! 1. takes the user's session slot for the whole event,
//! 2. runs the access gate for privileged buttons and commands,
//! 3. routes to a dialogue flow or a one-shot service call.

use tracing::{debug, info, warn};

use crate::access::AccessGate;
use crate::client::ServiceClient;
use crate::dialogue::{
    advance, prompt_key, AddCategoryStep, AddMenuStep, AddPromoStep, DialogueState, Submission,
    Transition,
};
use crate::errors::{ErrorKind, RpcError};
use crate::localization::{t_args_lang, t_lang};
use crate::models::{CafeInfo, MenuItem, Promo};
use crate::session::{destroy, SessionGuard, SessionStore};
use crate::validation::{format_price, DiscountType};

/// Buttons that require an administrator
pub const PRIVILEGED_ACTIONS: &[&str] = &[
    "show_admin_panel",
    "admin_menu",
    "admin_promo",
    "admin_info",
    "admin_category",
    "menu_create",
    "menu_read_all",
    "menu_update_list",
    "menu_delete_list",
    "confirm_delete_menu",
    "delete_menu",
    "edit_menu",
    "promo_create",
    "promo_read_all",
    "promo_update_list",
    "promo_delete_list",
    "confirm_delete_promo",
    "delete_promo",
    "edit_promo",
    "category_create",
    "category_read_all",
    "category_delete_list",
    "confirm_delete_category",
    "delete_category",
    "info_read",
    "info_update",
];

/// The user behind an event
#[derive(Debug, Clone, PartialEq)]
pub struct UserRef {
    pub id: i64,
    pub username: Option<String>,
    pub language_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Menu,
    Promo,
    Info,
    Admin,
    Cancel,
    Unknown(String),
}

impl Command {
    /// Parse `/name`, `/name@bot` or `/name args`; `None` for plain text
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.trim().strip_prefix('/')?.split_whitespace().next()?;
        let name = word.split('@').next().unwrap_or(word).to_lowercase();

        Some(match name.as_str() {
            "start" => Command::Start,
            "help" => Command::Help,
            "menu" => Command::Menu,
            "promo" => Command::Promo,
            "info" => Command::Info,
            "admin" => Command::Admin,
            "cancel" => Command::Cancel,
            _ => Command::Unknown(name),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    Command(Command),
    Button { action: String, args: Option<String> },
    Text(String),
}

impl EventKind {
    /// A typed message: a command when it looks like one, text otherwise
    pub fn from_text(text: &str) -> Self {
        match Command::parse(text) {
            Some(command) => EventKind::Command(command),
            None => EventKind::Text(text.to_string()),
        }
    }

    /// Button data encoded as `action:args`
    pub fn from_button(data: &str) -> Self {
        match data.split_once(':') {
            Some((action, args)) => EventKind::Button {
                action: action.to_string(),
                args: Some(args.to_string()),
            },
            None => EventKind::Button {
                action: data.to_string(),
                args: None,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InboundEvent {
    pub user: UserRef,
    pub kind: EventKind,
}

/// A button: label shown to the user and the `action[:args]` it sends back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub action: String,
}

/// One message to show the user
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reply {
    pub text: String,
    pub buttons: Vec<Vec<Button>>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            buttons: Vec::new(),
        }
    }

    pub fn with_buttons(text: impl Into<String>, buttons: Vec<Vec<Button>>) -> Self {
        Self {
            text: text.into(),
            buttons,
        }
    }
}

/// Per-event view of the user
struct Ctx<'a> {
    user: &'a UserRef,
    lang: Option<&'a str>,
}

impl Ctx<'_> {
    fn t(&self, key: &str) -> String {
        t_lang(key, self.lang)
    }

    fn t_args(&self, key: &str, args: &[(&str, &str)]) -> String {
        t_args_lang(key, args, self.lang)
    }

    fn button(&self, key: &str, action: impl Into<String>) -> Vec<Button> {
        vec![Button {
            label: self.t(key),
            action: action.into(),
        }]
    }
}

fn id_arg(args: Option<&str>) -> Option<i64> {
    args?.trim().parse().ok()
}

pub struct FrontController {
    client: ServiceClient,
    gate: AccessGate,
    sessions: SessionStore,
}

impl FrontController {
    pub fn new(client: ServiceClient, gate: AccessGate, sessions: SessionStore) -> Self {
        Self {
            client,
            gate,
            sessions,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Handle one event and return the replies, in order
    pub async fn handle(&self, event: InboundEvent) -> Vec<Reply> {
        let mut session = self.sessions.lock(event.user.id).await;
        let ctx = Ctx {
            user: &event.user,
            lang: event.user.language_code.as_deref(),
        };

        match &event.kind {
            EventKind::Command(command) => self.handle_command(&ctx, &mut session, command).await,
            EventKind::Button { action, args } => {
                self.handle_button(&ctx, &mut session, action, args.as_deref())
                    .await
            }
            EventKind::Text(text) => self.handle_text(&ctx, &mut session, text).await,
        }
    }

    async fn is_admin(&self, ctx: &Ctx<'_>) -> bool {
        self.gate
            .is_privileged(ctx.user.id, ctx.user.username.as_deref())
            .await
    }

    async fn handle_command(
        &self,
        ctx: &Ctx<'_>,
        session: &mut SessionGuard,
        command: &Command,
    ) -> Vec<Reply> {
        info!(user_id = ctx.user.id, command = ?command, "Command received");

        match command {
            Command::Start => self.start_screen(ctx).await,
            Command::Help => vec![Reply::text(ctx.t("help-message"))],
            Command::Menu => self.public_menu(ctx).await,
            Command::Promo => self.public_promos(ctx).await,
            Command::Info => self.cafe_info(ctx, "back:start").await,
            Command::Admin => {
                if self.is_admin(ctx).await {
                    vec![self.admin_panel(ctx)]
                } else {
                    warn!(user_id = ctx.user.id, "Admin panel denied");
                    vec![Reply::text(ctx.t("access-denied"))]
                }
            }
            Command::Cancel => vec![cancel(ctx, session)],
            Command::Unknown(name) => {
                debug!(user_id = ctx.user.id, command = %name, "Unknown command");
                vec![Reply::text(ctx.t("unknown-command"))]
            }
        }
    }

    async fn handle_button(
        &self,
        ctx: &Ctx<'_>,
        session: &mut SessionGuard,
        action: &str,
        args: Option<&str>,
    ) -> Vec<Reply> {
        info!(user_id = ctx.user.id, action, args = ?args, "Button pressed");

        let privileged = PRIVILEGED_ACTIONS.contains(&action)
            || (action == "back" && args == Some("admin"));
        if privileged && !self.is_admin(ctx).await {
            warn!(user_id = ctx.user.id, action, "Privileged action denied");
            return vec![Reply::text(ctx.t("access-denied"))];
        }

        match (action, args) {
            ("show_user_menu", _) | ("back", Some("user")) => self.public_menu(ctx).await,
            ("show_promo", _) => self.public_promos(ctx).await,
            ("show_info", _) => self.cafe_info(ctx, "back:start").await,
            ("menu_category", Some(name)) => self.category_items(ctx, name).await,
            ("menu_detail", id) => match id_arg(id) {
                Some(id) => self.menu_detail(ctx, id).await,
                None => Vec::new(),
            },
            ("back", Some("start")) => self.start_screen(ctx).await,
            ("back", Some("admin")) | ("show_admin_panel", _) => vec![self.admin_panel(ctx)],
            ("cancel", _) => vec![cancel(ctx, session)],

            ("admin_menu", _) => vec![self.menu_management(ctx)],
            ("admin_promo", _) => vec![self.promo_management(ctx)],
            ("admin_category", _) => vec![self.category_management(ctx)],
            ("admin_info", _) => vec![self.info_management(ctx)],

            ("menu_create", _) => vec![
                self.start_flow(
                    ctx,
                    session,
                    DialogueState::AddMenu(AddMenuStep::Name),
                    "menu-create-title",
                )
                .await,
            ],
            ("menu_read_all", _) => self.admin_menu_list(ctx).await,
            ("menu_update_list", _) => self.menu_picker(ctx, "edit_menu", "menu-update-pick").await,
            ("menu_delete_list", _) => {
                self.menu_picker(ctx, "confirm_delete_menu", "menu-delete-pick")
                    .await
            }
            ("confirm_delete_menu", id) => match id_arg(id) {
                Some(id) => vec![confirm_delete(
                    ctx,
                    "menu-delete-confirm",
                    "delete_menu",
                    &id.to_string(),
                    "admin_menu",
                )],
                None => Vec::new(),
            },
            ("delete_menu", id) => match id_arg(id) {
                Some(id) => self.delete_menu(ctx, id).await,
                None => Vec::new(),
            },
            ("edit_menu", _) | ("edit_promo", _) | ("info_update", _) => {
                vec![Reply::text(ctx.t("feature-coming-soon"))]
            }

            ("promo_create", _) => vec![
                self.start_flow(
                    ctx,
                    session,
                    DialogueState::AddPromo(AddPromoStep::Title),
                    "promo-create-title",
                )
                .await,
            ],
            ("promo_read_all", _) => self.admin_promo_list(ctx).await,
            ("promo_update_list", _) => {
                self.promo_picker(ctx, "edit_promo", "promo-update-pick")
                    .await
            }
            ("promo_delete_list", _) => {
                self.promo_picker(ctx, "confirm_delete_promo", "promo-delete-pick")
                    .await
            }
            ("confirm_delete_promo", id) => match id_arg(id) {
                Some(id) => vec![confirm_delete(
                    ctx,
                    "promo-delete-confirm",
                    "delete_promo",
                    &id.to_string(),
                    "admin_promo",
                )],
                None => Vec::new(),
            },
            ("delete_promo", id) => match id_arg(id) {
                Some(id) => self.delete_promo(ctx, id).await,
                None => Vec::new(),
            },

            ("category_create", _) => vec![
                self.start_flow(
                    ctx,
                    session,
                    DialogueState::AddCategory(AddCategoryStep::Name),
                    "category-create-title",
                )
                .await,
            ],
            ("category_read_all", _) => self.admin_category_list(ctx).await,
            ("category_delete_list", _) => self.category_picker(ctx).await,
            ("confirm_delete_category", Some(name)) if !name.is_empty() => vec![confirm_delete(
                ctx,
                "category-delete-confirm",
                "delete_category",
                name,
                "admin_category",
            )],
            ("delete_category", Some(name)) if !name.is_empty() => {
                self.delete_category(ctx, name).await
            }

            ("info_read", _) => self.cafe_info(ctx, "admin_info").await,

            _ => {
                debug!(user_id = ctx.user.id, action, "Ignoring unknown button");
                Vec::new()
            }
        }
    }

    async fn handle_text(
        &self,
        ctx: &Ctx<'_>,
        session: &mut SessionGuard,
        text: &str,
    ) -> Vec<Reply> {
        if matches!(**session, DialogueState::Idle) {
            return vec![Reply::text(ctx.t("default-reply"))];
        }

        match advance(&**session, text) {
            Transition::Advance(next) => {
                debug!(user_id = ctx.user.id, state = ?next, "Dialogue advanced");
                let prompt = self.prompt(ctx, &next).await;
                **session = next;
                vec![Reply::text(prompt)]
            }
            Transition::Reject(key) => {
                debug!(user_id = ctx.user.id, reason = key, "Dialogue input rejected");
                vec![Reply::text(ctx.t(key))]
            }
            Transition::Submit(submission) => {
                // the flow ends here whatever the service answers
                destroy(session);
                vec![self.submit(ctx, submission).await]
            }
            Transition::Unrecognized => {
                warn!(user_id = ctx.user.id, "Dialogue state not recognized, resetting");
                destroy(session);
                vec![Reply::text(ctx.t("state-unrecognized"))]
            }
        }
    }

    /// Replace any running flow with a new one
    async fn start_flow(
        &self,
        ctx: &Ctx<'_>,
        session: &mut SessionGuard,
        state: DialogueState,
        title_key: &str,
    ) -> Reply {
        if !matches!(**session, DialogueState::Idle) {
            debug!(user_id = ctx.user.id, previous = ?**session, "Discarding unfinished flow");
        }
        let prompt = self.prompt(ctx, &state).await;
        **session = state;
        Reply::text(format!(
            "{}\n\n{}\n\n{}",
            ctx.t(title_key),
            prompt,
            ctx.t("cancel-hint")
        ))
    }

    async fn prompt(&self, ctx: &Ctx<'_>, state: &DialogueState) -> String {
        let prompt = ctx.t(prompt_key(state));

        if !matches!(state, DialogueState::AddMenu(AddMenuStep::Category { .. })) {
            return prompt;
        }

        // best effort: a failed lookup still prompts
        match self.client.list_categories().await {
            Ok(categories) if !categories.is_empty() => {
                let choices: Vec<String> =
                    categories.iter().map(|c| format!("• {}", c.name)).collect();
                format!(
                    "{}\n{}\n\n{}",
                    ctx.t("menu-category-choices"),
                    choices.join("\n"),
                    prompt
                )
            }
            Ok(_) => prompt,
            Err(e) => {
                warn!(user_id = ctx.user.id, error = %e, "Category lookup failed");
                prompt
            }
        }
    }

    async fn submit(&self, ctx: &Ctx<'_>, submission: Submission) -> Reply {
        let user_id = ctx.user.id;
        match submission {
            Submission::Menu(payload) => match self.client.create_menu(payload).await {
                Ok(item) => {
                    info!(user_id, menu_id = item.id, "Menu item created");
                    Reply::text(ctx.t_args(
                        "menu-created",
                        &[
                            ("name", item.name.as_str()),
                            ("price", format_price(item.price).as_str()),
                        ],
                    ))
                }
                Err(e) => failure(ctx, &e, "menu-create-failed"),
            },
            Submission::Promo(payload) => match self.client.create_promo(payload).await {
                Ok(promo) => {
                    info!(user_id, promo_id = promo.id, "Promo created");
                    Reply::text(ctx.t_args("promo-created", &[("title", promo.title.as_str())]))
                }
                Err(e) => failure(ctx, &e, "promo-create-failed"),
            },
            Submission::Category(payload) => {
                match self.client.create_category(&payload.name).await {
                    Ok(category) => {
                        info!(user_id, category = %category.name, "Category created");
                        Reply::text(
                            ctx.t_args("category-created", &[("name", category.name.as_str())]),
                        )
                    }
                    Err(e) => failure(ctx, &e, "category-create-failed"),
                }
            }
        }
    }

    async fn start_screen(&self, ctx: &Ctx<'_>) -> Vec<Reply> {
        if self.is_admin(ctx).await {
            return vec![self.admin_panel(ctx)];
        }
        vec![Reply::with_buttons(
            ctx.t("welcome-user"),
            vec![
                ctx.button("btn-user-menu", "show_user_menu"),
                ctx.button("btn-promo", "show_promo"),
                ctx.button("btn-info", "show_info"),
            ],
        )]
    }

    fn admin_panel(&self, ctx: &Ctx<'_>) -> Reply {
        Reply::with_buttons(
            ctx.t("admin-panel-title"),
            vec![
                ctx.button("btn-admin-menu", "admin_menu"),
                ctx.button("btn-admin-promo", "admin_promo"),
                ctx.button("btn-admin-category", "admin_category"),
                ctx.button("btn-admin-info", "admin_info"),
                ctx.button("btn-user-view", "show_user_menu"),
            ],
        )
    }

    fn menu_management(&self, ctx: &Ctx<'_>) -> Reply {
        Reply::with_buttons(
            ctx.t("menu-management-title"),
            vec![
                ctx.button("btn-create", "menu_create"),
                ctx.button("btn-read-all", "menu_read_all"),
                ctx.button("btn-update", "menu_update_list"),
                ctx.button("btn-delete", "menu_delete_list"),
                ctx.button("btn-back", "back:admin"),
            ],
        )
    }

    fn promo_management(&self, ctx: &Ctx<'_>) -> Reply {
        Reply::with_buttons(
            ctx.t("promo-management-title"),
            vec![
                ctx.button("btn-create", "promo_create"),
                ctx.button("btn-read-all", "promo_read_all"),
                ctx.button("btn-update", "promo_update_list"),
                ctx.button("btn-delete", "promo_delete_list"),
                ctx.button("btn-back", "back:admin"),
            ],
        )
    }

    fn category_management(&self, ctx: &Ctx<'_>) -> Reply {
        Reply::with_buttons(
            ctx.t("category-management-title"),
            vec![
                ctx.button("btn-create", "category_create"),
                ctx.button("btn-read-all", "category_read_all"),
                ctx.button("btn-delete", "category_delete_list"),
                ctx.button("btn-back", "back:admin"),
            ],
        )
    }

    fn info_management(&self, ctx: &Ctx<'_>) -> Reply {
        Reply::with_buttons(
            ctx.t("info-management-title"),
            vec![
                ctx.button("btn-info-read", "info_read"),
                ctx.button("btn-info-update", "info_update"),
                ctx.button("btn-back", "back:admin"),
            ],
        )
    }

    async fn public_menu(&self, ctx: &Ctx<'_>) -> Vec<Reply> {
        match self.client.list_categories().await {
            Ok(categories) => {
                let mut buttons: Vec<Vec<Button>> = categories
                    .iter()
                    .map(|c| vec![Button {
                        label: c.name.clone(),
                        action: format!("menu_category:{}", c.name),
                    }])
                    .collect();
                buttons.push(ctx.button("btn-back", "back:start"));
                vec![Reply::with_buttons(ctx.t("menu-pick-category"), buttons)]
            }
            Err(e) => vec![failure(ctx, &e, "menu-load-failed")],
        }
    }

    async fn category_items(&self, ctx: &Ctx<'_>, category: &str) -> Vec<Reply> {
        let items = match self.client.list_menus(Some(category)).await {
            Ok(items) => items,
            Err(e) => return vec![failure(ctx, &e, "menu-load-failed")],
        };
        let available: Vec<&MenuItem> = items.iter().filter(|m| m.is_available).collect();

        let mut buttons: Vec<Vec<Button>> = available
            .iter()
            .map(|m| vec![Button {
                label: m.name.clone(),
                action: format!("menu_detail:{}", m.id),
            }])
            .collect();
        buttons.push(ctx.button("btn-back", "back:user"));

        let text = if available.is_empty() {
            ctx.t_args("menu-category-no-items", &[("category", category)])
        } else {
            let lines: Vec<String> = available.iter().map(|m| menu_line(ctx, m)).collect();
            format!("📂 {}\n\n{}", category, lines.join("\n"))
        };
        vec![Reply::with_buttons(text, buttons)]
    }

    async fn menu_detail(&self, ctx: &Ctx<'_>, id: i64) -> Vec<Reply> {
        match self.client.get_menu(id).await {
            Ok(item) => {
                let mut text = format!(
                    "🍽️ {}\n💰 {}\n📂 {}",
                    item.name,
                    format_price(item.price),
                    item.category
                );
                if !item.description.is_empty() {
                    text.push_str(&format!("\n\n{}", item.description));
                }
                vec![Reply::with_buttons(
                    text,
                    vec![ctx.button("btn-back", format!("menu_category:{}", item.category))],
                )]
            }
            Err(e) => vec![failure(ctx, &e, "menu-load-failed")],
        }
    }

    async fn public_promos(&self, ctx: &Ctx<'_>) -> Vec<Reply> {
        match self.client.list_promos(true).await {
            Ok(promos) if promos.is_empty() => vec![Reply::with_buttons(
                ctx.t("promo-empty"),
                vec![ctx.button("btn-back", "back:start")],
            )],
            Ok(promos) => vec![Reply::with_buttons(
                format!("{}\n\n{}", ctx.t("promo-list-title"), promo_lines(ctx, &promos)),
                vec![ctx.button("btn-back", "back:start")],
            )],
            Err(e) => vec![failure(ctx, &e, "promo-load-failed")],
        }
    }

    async fn cafe_info(&self, ctx: &Ctx<'_>, back: &str) -> Vec<Reply> {
        match self.client.cafe_info().await {
            Ok(info) => vec![Reply::with_buttons(
                info_text(ctx, &info),
                vec![ctx.button("btn-back", back)],
            )],
            Err(e) => vec![failure(ctx, &e, "info-load-failed")],
        }
    }

    async fn admin_menu_list(&self, ctx: &Ctx<'_>) -> Vec<Reply> {
        match self.client.list_menus(None).await {
            Ok(items) if items.is_empty() => vec![Reply::with_buttons(
                ctx.t("menu-empty"),
                vec![ctx.button("btn-back", "admin_menu")],
            )],
            Ok(items) => {
                let lines: Vec<String> = items.iter().map(|m| menu_line(ctx, m)).collect();
                vec![Reply::with_buttons(
                    format!("{}\n\n{}", ctx.t("menu-list-title"), lines.join("\n")),
                    vec![ctx.button("btn-back", "admin_menu")],
                )]
            }
            Err(e) => vec![failure(ctx, &e, "menu-load-failed")],
        }
    }

    async fn menu_picker(&self, ctx: &Ctx<'_>, action: &str, title_key: &str) -> Vec<Reply> {
        match self.client.list_menus(None).await {
            Ok(items) if items.is_empty() => vec![Reply::with_buttons(
                ctx.t("menu-empty"),
                vec![ctx.button("btn-back", "admin_menu")],
            )],
            Ok(items) => {
                let mut buttons: Vec<Vec<Button>> = items
                    .iter()
                    .map(|m| vec![Button {
                        label: format!("{} ({})", m.name, format_price(m.price)),
                        action: format!("{action}:{}", m.id),
                    }])
                    .collect();
                buttons.push(ctx.button("btn-back", "admin_menu"));
                vec![Reply::with_buttons(ctx.t(title_key), buttons)]
            }
            Err(e) => vec![failure(ctx, &e, "menu-load-failed")],
        }
    }

    async fn delete_menu(&self, ctx: &Ctx<'_>, id: i64) -> Vec<Reply> {
        match self.client.delete_menu(id).await {
            Ok(()) => {
                info!(user_id = ctx.user.id, menu_id = id, "Menu item deleted");
                vec![Reply::text(ctx.t("menu-deleted")), self.menu_management(ctx)]
            }
            Err(e) => vec![failure(ctx, &e, "menu-delete-failed")],
        }
    }

    async fn admin_promo_list(&self, ctx: &Ctx<'_>) -> Vec<Reply> {
        match self.client.list_promos(false).await {
            Ok(promos) if promos.is_empty() => vec![Reply::with_buttons(
                ctx.t("promo-empty"),
                vec![ctx.button("btn-back", "admin_promo")],
            )],
            Ok(promos) => vec![Reply::with_buttons(
                format!("{}\n\n{}", ctx.t("promo-list-title"), promo_lines(ctx, &promos)),
                vec![ctx.button("btn-back", "admin_promo")],
            )],
            Err(e) => vec![failure(ctx, &e, "promo-load-failed")],
        }
    }

    async fn promo_picker(&self, ctx: &Ctx<'_>, action: &str, title_key: &str) -> Vec<Reply> {
        match self.client.list_promos(false).await {
            Ok(promos) if promos.is_empty() => vec![Reply::with_buttons(
                ctx.t("promo-empty"),
                vec![ctx.button("btn-back", "admin_promo")],
            )],
            Ok(promos) => {
                let mut buttons: Vec<Vec<Button>> = promos
                    .iter()
                    .map(|p| vec![Button {
                        label: p.title.clone(),
                        action: format!("{action}:{}", p.id),
                    }])
                    .collect();
                buttons.push(ctx.button("btn-back", "admin_promo"));
                vec![Reply::with_buttons(ctx.t(title_key), buttons)]
            }
            Err(e) => vec![failure(ctx, &e, "promo-load-failed")],
        }
    }

    async fn delete_promo(&self, ctx: &Ctx<'_>, id: i64) -> Vec<Reply> {
        match self.client.delete_promo(id).await {
            Ok(()) => {
                info!(user_id = ctx.user.id, promo_id = id, "Promo deleted");
                vec![Reply::text(ctx.t("promo-deleted")), self.promo_management(ctx)]
            }
            Err(e) => vec![failure(ctx, &e, "promo-delete-failed")],
        }
    }

    async fn admin_category_list(&self, ctx: &Ctx<'_>) -> Vec<Reply> {
        match self.client.list_categories().await {
            Ok(categories) => {
                let lines: Vec<String> =
                    categories.iter().map(|c| format!("• {}", c.name)).collect();
                vec![Reply::with_buttons(
                    format!("{}\n\n{}", ctx.t("category-list-title"), lines.join("\n")),
                    vec![ctx.button("btn-back", "admin_category")],
                )]
            }
            Err(e) => vec![failure(ctx, &e, "category-load-failed")],
        }
    }

    async fn category_picker(&self, ctx: &Ctx<'_>) -> Vec<Reply> {
        match self.client.list_categories().await {
            Ok(categories) => {
                let mut buttons: Vec<Vec<Button>> = categories
                    .iter()
                    .map(|c| vec![Button {
                        label: c.name.clone(),
                        action: format!("confirm_delete_category:{}", c.name),
                    }])
                    .collect();
                buttons.push(ctx.button("btn-back", "admin_category"));
                vec![Reply::with_buttons(ctx.t("category-delete-pick"), buttons)]
            }
            Err(e) => vec![failure(ctx, &e, "category-load-failed")],
        }
    }

    async fn delete_category(&self, ctx: &Ctx<'_>, name: &str) -> Vec<Reply> {
        match self.client.delete_category(name).await {
            Ok(()) => {
                info!(user_id = ctx.user.id, category = name, "Category deleted");
                vec![
                    Reply::text(ctx.t("category-deleted")),
                    self.category_management(ctx),
                ]
            }
            Err(e) => vec![failure(ctx, &e, "category-delete-failed")],
        }
    }
}

fn cancel(ctx: &Ctx<'_>, session: &mut SessionGuard) -> Reply {
    if matches!(**session, DialogueState::Idle) {
        return Reply::text(ctx.t("cancel-nothing"));
    }
    info!(user_id = ctx.user.id, "Dialogue cancelled");
    destroy(session);
    Reply::text(ctx.t("cancel-done"))
}

fn confirm_delete(ctx: &Ctx<'_>, key: &str, action: &str, target: &str, back: &str) -> Reply {
    Reply::with_buttons(
        ctx.t_args(key, &[("target", target)]),
        vec![
            ctx.button("btn-confirm-delete", format!("{action}:{target}")),
            ctx.button("btn-cancel", back),
        ],
    )
}

/// User-facing text for a failed service call
fn failure(ctx: &Ctx<'_>, err: &RpcError, key: &str) -> Reply {
    warn!(user_id = ctx.user.id, error = %err, "Service call failed");

    let text = match err.kind() {
        ErrorKind::ServiceUnavailable => ctx.t("error-service-unavailable"),
        ErrorKind::Unauthorized => ctx.t("access-denied"),
        _ => match err.user_message() {
            Some(detail) => format!("{}\n{}", ctx.t(key), detail),
            None => ctx.t(key),
        },
    };
    Reply::text(text)
}

fn menu_line(ctx: &Ctx<'_>, item: &MenuItem) -> String {
    let mut line = format!("• {} - {}", item.name, format_price(item.price));
    if !item.is_available {
        line.push_str(&format!(" ({})", ctx.t("menu-unavailable")));
    }
    line
}

fn promo_lines(ctx: &Ctx<'_>, promos: &[Promo]) -> String {
    promos
        .iter()
        .map(|p| {
            let discount = match p.discount_type {
                DiscountType::Percentage => format!("{}%", p.discount),
                DiscountType::Amount => format_price(p.discount),
            };
            let mut text = ctx.t_args(
                "promo-line",
                &[
                    ("title", p.title.as_str()),
                    ("discount", discount.as_str()),
                    ("start", p.start_date.to_string().as_str()),
                    ("end", p.end_date.to_string().as_str()),
                ],
            );
            if !p.description.is_empty() {
                text.push_str(&format!("\n   {}", p.description));
            }
            text
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn info_text(ctx: &Ctx<'_>, info: &CafeInfo) -> String {
    let mut text = ctx.t_args(
        "info-details",
        &[
            ("name", info.name.as_str()),
            ("address", info.address.as_str()),
            ("phone", info.phone.as_str()),
            ("opening", info.opening_hour.as_str()),
            ("closing", info.closing_hour.as_str()),
        ],
    );
    if !info.email.is_empty() {
        text.push_str(&format!("\n📧 {}", info.email));
    }
    if !info.description.is_empty() {
        text.push_str(&format!("\n\n{}", info.description));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_parsing() {
        assert_eq!(Command::parse("/start"), Some(Command::Start));
        assert_eq!(Command::parse("/Cancel@cafe_bot"), Some(Command::Cancel));
        assert_eq!(Command::parse("/menu coffee"), Some(Command::Menu));
        assert_eq!(
            Command::parse("/brew"),
            Some(Command::Unknown("brew".to_string()))
        );
        assert_eq!(Command::parse("Latte"), None);
        assert_eq!(Command::parse("/"), None);
    }

    #[test]
    fn test_button_split_on_first_colon() {
        assert_eq!(
            EventKind::from_button("delete_category:Tea: Hot"),
            EventKind::Button {
                action: "delete_category".to_string(),
                args: Some("Tea: Hot".to_string()),
            }
        );
        assert_eq!(
            EventKind::from_button("cancel"),
            EventKind::Button {
                action: "cancel".to_string(),
                args: None,
            }
        );
    }

    #[test]
    fn test_text_event() {
        assert_eq!(
            EventKind::from_text("25000"),
            EventKind::Text("25000".to_string())
        );
        assert_eq!(
            EventKind::from_text("/cancel"),
            EventKind::Command(Command::Cancel)
        );
    }
}
