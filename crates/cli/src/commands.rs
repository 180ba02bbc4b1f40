//! CLI commands

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use serde::Serialize;
use smm_core::{FileTokenStorage, Identity};
use smm_http::SmmClient;
use smm_http::types::catalog::ServiceType;
use smm_http::types::orders::PlaceOrder;
use smm_http::types::wallet::{DepositRequest, PaymentMethod, TransactionStatus};
use smm_http::types::{Pagination, Upload};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::Settings;

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in and keep the session tokens
    Login {
        email: String,

        #[arg(long, env = "SMM_PASSWORD", hide_env_values = true)]
        password: String,

        /// Sign in to the back office
        #[arg(long)]
        admin: bool,
    },

    /// Create an account and sign in
    Signup {
        name: String,

        email: String,

        #[arg(long, env = "SMM_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Email a password reset link
    ForgotPassword { email: String },

    /// Set a new password with the token from the reset email
    ResetPassword {
        token: String,

        #[arg(long, env = "SMM_NEW_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// End a session
    Logout {
        #[arg(long)]
        admin: bool,
    },

    /// Show the signed-in user's profile and account status
    Whoami,

    /// List or search categories
    Categories {
        #[arg(long)]
        search: Option<String>,

        #[command(flatten)]
        page: PageArgs,
    },

    /// List or search platforms
    Platforms {
        /// Restrict to one category slug
        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        search: Option<String>,

        #[command(flatten)]
        page: PageArgs,
    },

    /// List or search service titles of a platform
    Titles {
        platform_id: String,

        #[arg(long)]
        search: Option<String>,

        #[command(flatten)]
        page: PageArgs,
    },

    /// List or search services of a service title
    Services {
        service_title_id: String,

        #[arg(long)]
        search: Option<String>,

        #[command(flatten)]
        page: PageArgs,
    },

    /// Show a service by id or slug
    Service { id: String },

    /// Show the order history
    Orders {
        #[command(flatten)]
        page: PageArgs,
    },

    /// Show one order
    Order { id: String },

    /// Buy a service
    Buy {
        /// Service slug or id
        service: String,

        #[arg(long)]
        quantity: u64,

        /// Target profile or post, required by provider services
        #[arg(long)]
        link: Option<String>,
    },

    /// Show deposit history
    Deposits,

    /// Submit a deposit for review
    Deposit {
        #[arg(long, value_parser = parse_method)]
        method: PaymentMethod,

        #[arg(long)]
        amount: f64,

        /// Transfer reference
        #[arg(long)]
        reference: String,

        /// USD or LBP, Whish Money only
        #[arg(long)]
        currency: Option<String>,

        /// Screenshot or receipt of the transfer
        #[arg(long)]
        proof: Option<PathBuf>,
    },

    /// Back office operations
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },
}

#[derive(Subcommand)]
pub enum AdminCommands {
    /// List or search users
    Users {
        #[arg(long)]
        search: Option<String>,
    },

    /// Show a user with their transactions and orders
    User { id: String },

    /// Ban or unban a user
    Ban {
        id: String,

        #[arg(long)]
        unban: bool,
    },

    /// Credit or debit a user's wallet
    Balance {
        id: String,

        #[arg(allow_hyphen_values = true)]
        amount: f64,

        #[arg(long)]
        reason: Option<String>,
    },

    /// List or search deposits
    Deposits {
        #[arg(long, value_parser = parse_status)]
        status: Option<TransactionStatus>,

        #[arg(long)]
        search: Option<String>,

        #[command(flatten)]
        page: PageArgs,
    },

    ConfirmDeposit { id: String },

    RejectDeposit { id: String, reason: String },

    /// List or search orders
    Orders {
        #[arg(long)]
        status: Option<String>,

        #[arg(long)]
        search: Option<String>,

        #[command(flatten)]
        page: PageArgs,
    },

    /// Confirm a manual order, optionally with delivery notes
    ConfirmOrder {
        id: String,

        #[arg(long)]
        notes: Option<String>,
    },

    RejectOrder { id: String, reason: String },

    /// Dashboard numbers and series
    Analytics {
        /// Window of the daily series
        #[arg(long, default_value = "30d")]
        range: String,
    },

    /// Remaining credit at the provider
    ProviderBalance,

    /// Services offered by the provider
    Imported {
        #[arg(long, default_value = "")]
        query: String,

        #[command(flatten)]
        page: PageArgs,
    },
}

#[derive(clap::Args)]
pub struct PageArgs {
    #[arg(long)]
    page: Option<u32>,

    #[arg(long)]
    page_size: Option<u32>,
}

impl PageArgs {
    /// Requested page, falling back to the endpoint's default size
    fn pagination(&self, default_size: u32) -> Option<Pagination> {
        if self.page.is_none() && self.page_size.is_none() {
            return None;
        }
        Some(Pagination::new(
            self.page.unwrap_or(1),
            self.page_size.unwrap_or(default_size),
        ))
    }
}

fn parse_method(value: &str) -> Result<PaymentMethod, String> {
    match serde_json::from_value(serde_json::Value::String(value.to_lowercase())) {
        Ok(PaymentMethod::Unknown) | Err(_) => Err(format!("unknown payment method: {value}")),
        Ok(method) => Ok(method),
    }
}

fn parse_status(value: &str) -> Result<TransactionStatus, String> {
    match serde_json::from_value(serde_json::Value::String(value.to_lowercase())) {
        Ok(TransactionStatus::Unknown) | Err(_) => Err(format!("unknown status: {value}")),
        Ok(status) => Ok(status),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Build a client whose sessions persist in `data_dir`
pub fn build_client(settings: &Settings, data_dir: &Path) -> Result<SmmClient> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create {}", data_dir.display()))?;
    let storage = FileTokenStorage::in_dir(data_dir);
    info!(path = %storage.path().display(), "Using token storage");

    let mut builder = SmmClient::builder()
        .base_url(&settings.api_url)
        .refresh_timeout(Duration::from_secs(settings.refresh_timeout_secs))
        .token_storage(Arc::new(storage));
    if settings.timeout_secs > 0 {
        builder = builder.timeout(Duration::from_secs(settings.timeout_secs));
    }
    Ok(builder.build()?)
}

impl Commands {
    pub async fn execute(self, client: SmmClient) -> Result<()> {
        match self {
            Commands::Login {
                email,
                password,
                admin,
            } => {
                let response = if admin {
                    client.login_admin(email, password).await?
                } else {
                    client.login(email, password).await?
                };
                match response.user {
                    Some(user) => println!("Signed in as {}", user.email),
                    None => println!("Signed in"),
                }
                Ok(())
            }
            Commands::Signup {
                name,
                email,
                password,
            } => {
                client.signup(name, email.clone(), password).await?;
                println!("Account created for {email}");
                Ok(())
            }
            Commands::ForgotPassword { email } => {
                print_json(&client.request_password_reset(email).await?)
            }
            Commands::ResetPassword { token, password } => {
                print_json(&client.reset_password(token, password).await?)
            }
            Commands::Logout { admin } => {
                let identity = if admin { Identity::Admin } else { Identity::User };
                client.logout(identity).await;
                println!("Signed out");
                Ok(())
            }
            Commands::Whoami => {
                let (profile, security) = tokio::try_join!(client.profile(), client.security())?;
                print_json(&serde_json::json!({ "profile": profile, "security": security }))
            }
            Commands::Categories { search, page } => {
                let page = page.pagination(smm_http::client::catalog::CATEGORY_PAGE_SIZE);
                let categories = match search {
                    Some(query) => client.search_categories(&query, page).await?,
                    None => client.categories(page).await?,
                };
                print_json(&categories)
            }
            Commands::Platforms {
                category,
                search,
                page,
            } => {
                let page = page.pagination(smm_http::client::catalog::CATALOG_PAGE_SIZE);
                let platforms = match search {
                    Some(query) => {
                        client
                            .search_platforms(&query, category.as_deref(), page)
                            .await?
                    }
                    None => client.platforms(category.as_deref(), page).await?,
                };
                print_json(&platforms)
            }
            Commands::Titles {
                platform_id,
                search,
                page,
            } => {
                let page = page.pagination(smm_http::client::catalog::CATALOG_PAGE_SIZE);
                let titles = match search {
                    Some(query) => {
                        client
                            .search_service_titles(&query, Some(&platform_id), page)
                            .await?
                    }
                    None => client.service_titles(&platform_id, page).await?,
                };
                print_json(&titles)
            }
            Commands::Services {
                service_title_id,
                search,
                page,
            } => {
                let page = page.pagination(smm_http::client::catalog::CATALOG_PAGE_SIZE);
                let services = match search {
                    Some(query) => {
                        client
                            .search_services(&query, Some(&service_title_id), page)
                            .await?
                    }
                    None => client.services(&service_title_id, page).await?,
                };
                print_json(&services)
            }
            Commands::Service { id } => print_json(&client.service(&id).await?),
            Commands::Orders { page } => {
                let page = page.pagination(smm_http::client::orders::ORDERS_PAGE_SIZE);
                print_json(&client.user_orders(page).await?)
            }
            Commands::Order { id } => print_json(&client.user_order(&id).await?),
            Commands::Buy {
                service,
                quantity,
                link,
            } => {
                let details = client.service(&service).await?;
                if !details.accepts_quantity(quantity) {
                    bail!(
                        "quantity {quantity} is outside {}..={} for {}",
                        details.min,
                        details.max,
                        details.name
                    );
                }
                let service_type = details.service_type.unwrap_or(ServiceType::Api);
                if service_type == ServiceType::Api && link.is_none() {
                    bail!("--link is required for {}", details.name);
                }

                let order = PlaceOrder {
                    service: details.slug.unwrap_or(service),
                    quantity,
                    service_type,
                    provider_service_id: details.provider_service_id,
                    link: link.filter(|_| service_type == ServiceType::Api),
                };
                let receipt = client.place_order(&order).await?;
                println!(
                    "Order placed: {}",
                    receipt.order_id.as_deref().unwrap_or("unknown")
                );
                Ok(())
            }
            Commands::Deposits => print_json(&client.user_deposits().await?),
            Commands::Deposit {
                method,
                amount,
                reference,
                currency,
                proof,
            } => {
                let proof = proof.map(|path| read_upload(&path)).transpose()?;
                let response = client
                    .create_deposit(DepositRequest {
                        method,
                        amount,
                        reference,
                        currency,
                        proof,
                    })
                    .await?;
                print_json(&response)
            }
            Commands::Admin { command } => command.execute(client).await,
        }
    }
}

impl AdminCommands {
    pub async fn execute(self, client: SmmClient) -> Result<()> {
        use smm_http::client::admin::{ADMIN_ORDERS_PAGE_SIZE, DEPOSITS_PAGE_SIZE};

        match self {
            AdminCommands::Users { search } => {
                let users = match search {
                    Some(query) => client.search_users(&query).await?,
                    None => client.users().await?,
                };
                print_json(&users)
            }
            AdminCommands::User { id } => print_json(&client.user_profile(&id).await?),
            AdminCommands::Ban { id, unban } => {
                print_json(&client.set_user_banned(&id, !unban).await?)
            }
            AdminCommands::Balance { id, amount, reason } => {
                print_json(&client.adjust_balance(&id, amount, reason).await?)
            }
            AdminCommands::Deposits {
                status,
                search,
                page,
            } => {
                let page = page.pagination(DEPOSITS_PAGE_SIZE);
                let deposits = match search {
                    Some(query) => client.search_deposits(&query, page).await?,
                    None => client.deposits(status, page).await?,
                };
                print_json(&deposits)
            }
            AdminCommands::ConfirmDeposit { id } => {
                print_json(&client.confirm_deposit(&id).await?)
            }
            AdminCommands::RejectDeposit { id, reason } => {
                print_json(&client.reject_deposit(&id, reason).await?)
            }
            AdminCommands::Orders {
                status,
                search,
                page,
            } => {
                let page = page.pagination(ADMIN_ORDERS_PAGE_SIZE);
                let orders = match search {
                    Some(query) => client.search_admin_orders(&query, page).await?,
                    None => client.admin_orders(status.as_deref(), page).await?,
                };
                print_json(&orders)
            }
            AdminCommands::ConfirmOrder { id, notes } => {
                print_json(&client.confirm_order(&id, notes).await?)
            }
            AdminCommands::RejectOrder { id, reason } => {
                print_json(&client.reject_order(&id, reason).await?)
            }
            AdminCommands::Analytics { range } => {
                let (overview, deposits, orders, growth) = tokio::try_join!(
                    client.analytics_overview(),
                    client.daily_deposits(Some(&range)),
                    client.daily_orders(Some(&range)),
                    client.users_growth(),
                )?;
                print_json(&serde_json::json!({
                    "overview": overview,
                    "dailyDeposits": deposits,
                    "dailyOrders": orders,
                    "usersGrowth": growth,
                }))
            }
            AdminCommands::ProviderBalance => print_json(&client.provider_balance().await?),
            AdminCommands::Imported { query, page } => {
                let page = page.pagination(smm_http::client::admin::IMPORTED_SERVICES_PAGE_SIZE);
                print_json(&client.imported_services(&query, page).await?)
            }
        }
    }
}

fn read_upload(path: &Path) -> Result<Upload> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "proof".to_string());
    let upload = Upload::new(file_name, bytes);
    let content_type = match path.extension().and_then(|ext| ext.to_str()) {
        Some("png") => Some("image/png"),
        Some("jpg" | "jpeg") => Some("image/jpeg"),
        Some("pdf") => Some("application/pdf"),
        _ => None,
    };
    Ok(match content_type {
        Some(content_type) => upload.with_content_type(content_type),
        None => upload,
    })
}
