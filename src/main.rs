//! threatdeck console entry point
//!
//! Wires the configuration, token store, session context and clients
//! together, restores any persisted session, runs the route guard for the
//! requested view and dispatches. Reacting to a lost session (the
//! "please log in again" message) lives here, not in the transport.

use std::io::Write;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::debug;

use threatdeck::api::{self, ApiClient};
use threatdeck::auth::store::{FileTokenStore, TokenStore};
use threatdeck::auth::AuthClient;
use threatdeck::cli::{
    AwsCommand, Cli, Commands, MitigationsCommand, ReportsCommand, TasksCommand,
};
use threatdeck::routes::{guard, GuardDecision, Route};
use threatdeck::{Config, SessionContext};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = cli.apply_to(Config::from_env());

    tracing_subscriber::fmt()
        .with_max_level(if config.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::WARN
        })
        .with_target(false)
        .init();
    debug!("using backend at {}", config.api_url);

    let store: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new()?);
    let session = Arc::new(SessionContext::new());
    let auth = Arc::new(AuthClient::with_timeout(
        config.api_url.clone(),
        store.clone(),
        session.clone(),
        config.timeout,
    ));
    let apiclient = ApiClient::with_timeout(
        config.api_url.clone(),
        store.clone(),
        auth.clone(),
        config.timeout,
    );

    auth.load_cached_session()?;

    // Guard the requested view before touching the network. The session
    // snapshot is the only input; load_cached_session has already collapsed
    // "token missing" and "profile missing" into an anonymous session, so
    // storage is not consulted here.
    if let Some(route) = route_for(&cli.command) {
        let role = session.current_role();
        match guard(route, role.is_some(), role) {
            GuardDecision::Granted => {}
            GuardDecision::RedirectToLogin => {
                bail!("not logged in; run `threatdeck login <username>` first")
            }
            GuardDecision::RedirectTo(home) => {
                bail!(
                    "{} is not available for your role; your home view is {}",
                    route.path(),
                    home.path()
                )
            }
        }
    }

    let result = dispatch(cli.command, &apiclient, &auth, &config).await;
    match result {
        Ok(()) => Ok(()),
        Err(e) => {
            if let Some(api_err) = e.downcast_ref::<threatdeck::ApiError>() {
                if api_err.is_session_expired() {
                    bail!("session expired; run `threatdeck login <username>` to continue");
                }
            }
            Err(e)
        }
    }
}

/// View behind each subcommand; `None` means unguarded (login, logout,
/// whoami work in any session state).
fn route_for(command: &Commands) -> Option<Route> {
    match command {
        Commands::Login { .. } | Commands::Logout | Commands::Whoami => None,
        Commands::Analyze { .. } => Some(Route::Analyze),
        Commands::Reports { command } => Some(match command {
            ReportsCommand::Show { .. } => Route::ReportDetail,
            ReportsCommand::SendToAdmin { .. } => Route::SendToAdmin,
            _ => Route::Reports,
        }),
        Commands::Tasks { command } => Some(match command {
            TasksCommand::Create { .. } => Route::CreateTask,
            _ => Route::Tasks,
        }),
        Commands::Mitigations { .. } => Some(Route::Mitigations),
        Commands::Aws { .. } => Some(Route::AwsConfig),
        Commands::Dashboard { .. } => Some(Route::DashboardAdmin),
        Commands::Users { .. } => Some(Route::Users),
    }
}

async fn dispatch(
    command: Commands,
    api: &ApiClient,
    auth: &AuthClient,
    config: &Config,
) -> anyhow::Result<()> {
    match command {
        Commands::Login { username, password } => {
            let password = resolve_password(password)?;
            let user = auth.login(&username, &password).await?;
            println!("logged in as {} ({})", user.username, user.role);
        }

        Commands::Logout => {
            auth.logout().await?;
            println!("logged out");
        }

        Commands::Whoami => match auth.current_user() {
            Some(cached) => {
                // Prefer a fresh profile; the cached one is fine offline.
                let user = match auth.fetch_current_user().await {
                    Ok(user) => user,
                    Err(threatdeck::AuthError::Network(e)) => {
                        debug!("profile fetch failed, using cached: {e}");
                        cached
                    }
                    Err(e) => return Err(e.into()),
                };
                println!("{} <{}> role={}", user.username, user.email, user.role)
            }
            None => println!("not logged in"),
        },

        Commands::Analyze {
            input,
            file,
            engine,
        } => {
            let result = match (input, file) {
                (Some(input), None) => api::analysis::analyze_text(api, &input, engine).await?,
                (None, Some(path)) => {
                    let bytes = std::fs::read(&path)
                        .with_context(|| format!("reading {}", path.display()))?;
                    let name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| "upload".to_string());
                    api::analysis::analyze_file(api, name, bytes, engine).await?
                }
                _ => bail!("provide a text indicator or --file, not both"),
            };
            println!(
                "report #{}: {} {} severity={} score={} engine={}",
                result.id,
                result.input_type,
                result.input_value,
                result.severity,
                result.threat_score,
                result.engine_used
            );
        }

        Commands::Reports { command } => run_reports(command, api, config).await?,
        Commands::Tasks { command } => run_tasks(command, api).await?,
        Commands::Mitigations { command } => run_mitigations(command, api).await?,
        Commands::Aws { command } => run_aws(command, api).await?,

        Commands::Dashboard {
            analytics,
            date_from,
            date_to,
            severity,
        } => {
            if analytics {
                let filters = api::dashboard::AnalyticsFilters {
                    date_from,
                    date_to,
                    severity,
                };
                let payload = api::dashboard::analytics(api, &filters).await?;
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                // The admin overview shows infrastructure state alongside
                // the report stats; fetch both at once.
                let (stats, aws_status) =
                    futures::join!(api::dashboard::stats(api), api::aws::status(api));
                let stats = stats?;
                println!(
                    "reports: {} total, {} pending, {} critical, {} mitigated",
                    stats.overview.total_reports,
                    stats.overview.pending_reports,
                    stats.overview.critical_reports,
                    stats.overview.mitigated_reports
                );
                println!(
                    "trends: {} today / {} this week / {} this month",
                    stats.trends.today, stats.trends.this_week, stats.trends.this_month
                );
                println!(
                    "tasks: {} open, {} in progress, {} urgent",
                    stats.tasks.open, stats.tasks.in_progress, stats.tasks.urgent
                );
                println!(
                    "mitigations: {} pending, {} completed, {} failed",
                    stats.mitigations.pending, stats.mitigations.completed, stats.mitigations.failed
                );
                for threat in &stats.top_threats {
                    println!(
                        "  threat {} ({}) severity={} seen {}x",
                        threat.input_value, threat.input_type, threat.severity, threat.count
                    );
                }
                // AWS state is informational here; a failure does not sink
                // the overview.
                match aws_status {
                    Ok(status) if status.configured => println!(
                        "aws: configured, connected={}",
                        status.connected.unwrap_or(false)
                    ),
                    Ok(_) => println!("aws: not configured"),
                    Err(e) => debug!("aws status unavailable: {e}"),
                }
            }
        }

        Commands::Users { role, active } => {
            let filters = api::users::UserFilters {
                role,
                is_active: active.then_some(true),
            };
            for user in api::users::list(api, &filters).await? {
                println!(
                    "#{} {} <{}> role={} active={}",
                    user.id,
                    user.username,
                    user.email,
                    user.role,
                    user.is_active.unwrap_or(true)
                );
            }
        }
    }
    Ok(())
}

async fn run_reports(
    command: ReportsCommand,
    api: &ApiClient,
    config: &Config,
) -> anyhow::Result<()> {
    match command {
        ReportsCommand::List {
            page,
            severity,
            status,
            search,
        } => {
            let filters = api::reports::ReportFilters {
                severity,
                status,
                search,
            };
            let reports = api::reports::list(api, page, &filters).await?;
            println!("{} report(s), page {}", reports.count, page);
            for report in &reports.results {
                println!(
                    "#{} {} {} severity={} score={} status={}",
                    report.id,
                    report.input_type,
                    report.input_value,
                    report.severity,
                    report.threat_score,
                    report.status
                );
            }
        }
        ReportsCommand::Show { id } => {
            let report = api::reports::get(api, id).await?;
            println!("report #{}", report.id);
            println!("  input:    {} ({})", report.input_value, report.input_type);
            println!("  engine:   {}", report.engine_used);
            println!(
                "  verdict:  severity={} score={}",
                report.severity, report.threat_score
            );
            println!("  status:   {}", report.status);
            if let Some(analyst) = &report.analyst {
                println!("  analyst:  {}", analyst.username);
            }
            if let Some(notes) = &report.notes {
                if !notes.is_empty() {
                    println!("  notes:    {notes}");
                }
            }
            println!("  created:  {}", report.created_at);
            if let Some(reviewed) = &report.reviewed_at {
                println!("  reviewed: {reviewed}");
            }
        }
        ReportsCommand::SetStatus { id, status, notes } => {
            let report = api::reports::update_status(api, id, &status, notes.as_deref()).await?;
            println!("report #{} status={}", report.id, report.status);
        }
        ReportsCommand::Review { id, action } => {
            let report = api::reports::review(api, id, action).await?;
            println!("report #{} status={}", report.id, report.status);
        }
        ReportsCommand::Delete { id } => {
            api::reports::delete(api, id).await?;
            println!("report #{id} deleted");
        }
        ReportsCommand::SendToAdmin {
            id,
            admin_id,
            message,
        } => {
            let resp = api::reports::send_to_admin(api, id, admin_id, message.as_deref()).await?;
            println!(
                "report #{id} escalated to admin #{admin_id}{}",
                resp.detail.map(|d| format!(": {d}")).unwrap_or_default()
            );
        }
        ReportsCommand::Pdf { id } => {
            // PDF rendering is server-side; we only point at it.
            println!("{}{}", config.api_url, api::reports::pdf_path(id));
        }
    }
    Ok(())
}

async fn run_tasks(command: TasksCommand, api: &ApiClient) -> anyhow::Result<()> {
    match command {
        TasksCommand::List { status, priority } => {
            let filters = api::tasks::TaskFilters { status, priority };
            for task in api::tasks::list(api, &filters).await? {
                let assignee = task
                    .assigned_to
                    .map(|u| u.username)
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "#{} [{}] {} priority={} assignee={}",
                    task.id, task.status, task.title, task.priority, assignee
                );
            }
        }
        TasksCommand::Show { id } => {
            let task = api::tasks::get(api, id).await?;
            println!("task #{}: {}", task.id, task.title);
            println!("  {}", task.description);
            println!("  status={} priority={}", task.status, task.priority);
            if let Some(report) = &task.report {
                println!("  report #{} ({})", report.id, report.input_value);
            }
            if let Some(due) = &task.due_date {
                println!("  due {due}");
            }
        }
        TasksCommand::Create {
            title,
            description,
            priority,
            assigned_to,
            report,
            due_date,
        } => {
            let task = api::tasks::create(
                api,
                &api::tasks::TaskCreateRequest {
                    title,
                    description,
                    priority,
                    assigned_to_id: assigned_to,
                    report_id: report,
                    due_date,
                },
            )
            .await?;
            println!("created task #{}", task.id);
        }
        TasksCommand::Update {
            id,
            status,
            priority,
            assigned_to,
            due_date,
        } => {
            let task = api::tasks::update(
                api,
                id,
                &api::tasks::TaskUpdate {
                    status,
                    priority,
                    assigned_to_id: assigned_to,
                    due_date,
                },
            )
            .await?;
            println!("task #{} status={}", task.id, task.status);
        }
        TasksCommand::Delete { id } => {
            api::tasks::delete(api, id).await?;
            println!("task #{id} deleted");
        }
    }
    Ok(())
}

async fn run_mitigations(command: MitigationsCommand, api: &ApiClient) -> anyhow::Result<()> {
    match command {
        MitigationsCommand::List {
            status,
            action_type,
            report,
            page,
        } => {
            let filters = api::mitigations::MitigationFilters {
                status,
                action_type,
                report_id: report,
                page,
            };
            let mitigations = api::mitigations::list(api, &filters).await?;
            println!("{} mitigation(s)", mitigations.count);
            for m in &mitigations.results {
                println!(
                    "#{} [{}] {} target={} region={}",
                    m.id, m.status, m.action_type, m.target_value, m.aws_region
                );
            }
        }
        MitigationsCommand::Show { id } => {
            let m = api::mitigations::get(api, id).await?;
            println!("mitigation #{}: {}", m.id, m.action_type);
            println!("  target={} region={}", m.target_value, m.aws_region);
            println!("  status={}", m.status);
            println!("  {}", m.description);
            if let Some(by) = &m.initiated_by {
                println!("  initiated by {}", by.username);
            }
            if let Some(err) = &m.error_message {
                println!("  error: {err}");
            }
        }
        MitigationsCommand::Create {
            action_type,
            target,
            region,
            description,
            report,
            rule_number,
        } => {
            let m = api::mitigations::create(
                api,
                &api::mitigations::MitigationCreate {
                    action_type,
                    target_value: target,
                    aws_region: region,
                    description,
                    report,
                    rule_number,
                },
            )
            .await?;
            println!("created mitigation #{} (status={})", m.id, m.status);
        }
        MitigationsCommand::Update {
            id,
            action_type,
            target,
            region,
            description,
            rule_number,
        } => {
            let m = api::mitigations::update(
                api,
                id,
                &api::mitigations::MitigationUpdate {
                    action_type,
                    target_value: target,
                    aws_region: region,
                    description,
                    rule_number,
                },
            )
            .await?;
            println!("mitigation #{} updated (status={})", m.id, m.status);
        }
        MitigationsCommand::Execute { id } => {
            let resp = api::mitigations::execute(api, id).await?;
            if resp.success {
                println!(
                    "mitigation #{id} executed: {}",
                    resp.message.unwrap_or_else(|| "ok".to_string())
                );
            } else {
                bail!(
                    "mitigation #{id} failed: {}",
                    resp.error.unwrap_or_else(|| "unknown error".to_string())
                );
            }
        }
        MitigationsCommand::Delete { id } => {
            api::mitigations::delete(api, id).await?;
            println!("mitigation #{id} deleted");
        }
        MitigationsCommand::Stats => {
            let stats = api::mitigations::stats(api).await?;
            println!(
                "{} total: {} pending, {} in progress, {} completed, {} failed",
                stats.total, stats.pending, stats.in_progress, stats.completed, stats.failed
            );
            for (action_type, count) in &stats.by_type {
                println!("  {action_type}: {count}");
            }
        }
    }
    Ok(())
}

async fn run_aws(command: AwsCommand, api: &ApiClient) -> anyhow::Result<()> {
    match command {
        AwsCommand::Configs => {
            for config in api::aws::list_configurations(api).await? {
                println!(
                    "#{} {} region={} active={}",
                    config.id.unwrap_or(0),
                    config.name,
                    config.aws_region,
                    config.is_active
                );
            }
        }
        AwsCommand::Show { id } => {
            let config = api::aws::get_configuration(api, id).await?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        AwsCommand::Active => {
            let config = api::aws::active_configuration(api).await?;
            println!(
                "active: {} region={} auto_block={}",
                config.name, config.aws_region, config.auto_block_enabled
            );
        }
        AwsCommand::Create {
            name,
            access_key,
            secret_key,
            region,
            vpc_id,
            security_group,
            auto_block,
            auto_block_threshold,
        } => {
            let config = api::aws::create_configuration(
                api,
                &api::aws::AwsConfiguration {
                    id: None,
                    name,
                    aws_access_key: access_key,
                    aws_secret_key: Some(secret_key),
                    aws_session_token: None,
                    aws_region: region,
                    vpc_id,
                    security_group_id: security_group,
                    isolation_sg_id: None,
                    nacl_id: None,
                    waf_web_acl_name: None,
                    waf_ip_set_name: None,
                    network_firewall_arn: None,
                    log_group_name: None,
                    auto_block_enabled: auto_block,
                    auto_block_threshold,
                    is_active: false,
                    created_at: None,
                    updated_at: None,
                },
            )
            .await?;
            println!(
                "created configuration #{} ({}); run `threatdeck aws set-active` to use it",
                config.id.unwrap_or(0),
                config.name
            );
        }
        AwsCommand::Update {
            id,
            name,
            access_key,
            secret_key,
            region,
            vpc_id,
            security_group,
            auto_block,
            auto_block_threshold,
        } => {
            let config = api::aws::update_configuration(
                api,
                id,
                &api::aws::AwsConfigurationUpdate {
                    name,
                    aws_access_key: access_key,
                    aws_secret_key: secret_key,
                    aws_region: region,
                    vpc_id,
                    security_group_id: security_group,
                    auto_block_enabled: auto_block,
                    auto_block_threshold,
                },
            )
            .await?;
            println!("configuration #{id} updated ({})", config.name);
        }
        AwsCommand::Delete { id } => {
            api::aws::delete_configuration(api, id).await?;
            println!("configuration #{id} deleted");
        }
        AwsCommand::TestCredentials { id } => {
            let resp = api::aws::test_credentials(api, id).await?;
            if resp.success {
                let regions = resp.regions.unwrap_or_default();
                println!("credentials valid; {} region(s) reachable", regions.len());
            } else {
                bail!(
                    "credentials invalid: {}",
                    resp.error.unwrap_or_else(|| "unknown error".to_string())
                );
            }
        }
        AwsCommand::Resources { id } => {
            let resp = api::aws::get_resources(api, id).await?;
            match resp.resources {
                Some(resources) if resp.success => {
                    println!("{}", serde_json::to_string_pretty(&resources)?)
                }
                _ => bail!(
                    "resource discovery failed: {}",
                    resp.error.unwrap_or_else(|| "unknown error".to_string())
                ),
            }
        }
        AwsCommand::SetActive { id } => {
            let resp = api::aws::set_active(api, id).await?;
            println!("{}", resp.message);
        }
        AwsCommand::Status => {
            let status = api::aws::status(api).await?;
            if !status.configured {
                println!(
                    "no active AWS configuration{}",
                    status.message.map(|m| format!(": {m}")).unwrap_or_default()
                );
                return Ok(());
            }
            println!(
                "configured; connected={} credentials_valid={}",
                status.connected.unwrap_or(false),
                status.credentials_valid.unwrap_or(false)
            );
            if let Some(check) = &status.last_check {
                println!("last check {check}");
            }
        }
    }
    Ok(())
}

/// Password source order: flag, THREATDECK_PASSWORD, interactive prompt.
fn resolve_password(flag: Option<String>) -> anyhow::Result<String> {
    if let Some(password) = flag {
        return Ok(password);
    }
    if let Ok(password) = std::env::var("THREATDECK_PASSWORD") {
        return Ok(password);
    }
    print!("password: ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
