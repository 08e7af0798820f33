//! # docnum CLI Entry Point
//!
//! Operational commands against the PostgreSQL backend: seed the
//! classification/unit directory, preview the next number, issue batches,
//! and verify a number by its token.
//!
//! Configuration comes from the environment (`.env` files are honored):
//! `DATABASE_URL` for every command, `DOCNUM_EXTERNAL_ISSUER_UNIT` for the
//! commands that run the allocator.

use anyhow::Context;
use clap::Parser;
use uuid::Uuid;

use docnum_core::{
    Classification, ClassificationId, DocumentMetadata, DocumentType, IssueRequest, OrgUnit,
    RequestId, UnitId, VerificationToken,
};
use docnum_engine::{Allocator, EngineConfig};
use docnum_store::{IssuanceStore, PgStore};

/// Document numbering toolchain.
///
/// Issues gap-free, collision-free document numbers to organizational
/// units, and maintains the directory the numbering draws from.
#[derive(Parser, Debug)]
#[command(name = "docnum", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Add or update a classification in the directory.
    AddClassification {
        /// Display code embedded in full codes (e.g. OT.02.01).
        #[arg(long)]
        code: String,
        /// Human-readable name.
        #[arg(long)]
        name: String,
        /// Parent classification id, if any.
        #[arg(long)]
        parent: Option<Uuid>,
    },
    /// Add or update a unit in the directory.
    AddUnit {
        /// Display code embedded in full codes (e.g. D.IX.2.1).
        #[arg(long)]
        code: String,
        /// Human-readable name.
        #[arg(long)]
        name: String,
    },
    /// Show the next number a key would receive (advisory, reserves nothing).
    Preview {
        /// Classification id.
        #[arg(long)]
        classification: Uuid,
        /// Applicant unit id.
        #[arg(long)]
        unit: Uuid,
        /// Route through the external issuing authority.
        #[arg(long)]
        external: bool,
    },
    /// Issue a batch of document numbers.
    Issue {
        /// Classification id.
        #[arg(long)]
        classification: Uuid,
        /// Applicant unit id.
        #[arg(long)]
        unit: Uuid,
        /// How many numbers to issue.
        #[arg(long, default_value_t = 1)]
        qty: u32,
        /// Route through the external issuing authority.
        #[arg(long)]
        external: bool,
        /// Originating request id, recorded opaquely.
        #[arg(long)]
        request: Option<Uuid>,
        /// Subject line.
        #[arg(long)]
        subject: Option<String>,
        /// Addressee.
        #[arg(long)]
        recipient: Option<String>,
        /// Signing official.
        #[arg(long)]
        signer: Option<String>,
    },
    /// Look up an issued number by its verification token.
    Verify {
        /// The token, as embedded in the QR payload.
        #[arg(long)]
        token: Uuid,
    },
}

fn doc_type(external: bool) -> DocumentType {
    if external {
        DocumentType::External
    } else {
        DocumentType::Internal
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let store = PgStore::connect(&url).await?;
    store.migrate().await?;

    match cli.command {
        Commands::AddClassification { code, name, parent } => {
            let classification = Classification {
                parent: parent.map(ClassificationId),
                ..Classification::new(code, name)
            };
            store.put_classification(&classification).await?;
            println!("{}", serde_json::to_string_pretty(&classification)?);
        }
        Commands::AddUnit { code, name } => {
            let unit = OrgUnit::new(code, name);
            store.put_unit(&unit).await?;
            println!("{}", serde_json::to_string_pretty(&unit)?);
        }
        Commands::Preview {
            classification,
            unit,
            external,
        } => {
            let config = EngineConfig::from_env()?;
            let allocator = Allocator::new(store, config);
            let preview = allocator
                .peek_next(
                    doc_type(external),
                    ClassificationId(classification),
                    UnitId(unit),
                )
                .await?;
            println!("{}", serde_json::to_string_pretty(&preview)?);
        }
        Commands::Issue {
            classification,
            unit,
            qty,
            external,
            request,
            subject,
            recipient,
            signer,
        } => {
            let config = EngineConfig::from_env()?;
            let allocator = Allocator::new(store, config);
            let records = allocator
                .issue(IssueRequest {
                    doc_type: doc_type(external),
                    classification: ClassificationId(classification),
                    applicant_unit: UnitId(unit),
                    qty,
                    request_id: request.map(RequestId),
                    metadata: DocumentMetadata {
                        subject,
                        recipient,
                        signer,
                    },
                })
                .await?;
            tracing::info!(count = records.len(), "issued");
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        Commands::Verify { token } => {
            match store.find_by_token(&VerificationToken(token)).await? {
                Some(number) => println!("{}", serde_json::to_string_pretty(&number)?),
                None => anyhow::bail!("no issued number matches this token"),
            }
        }
    }

    Ok(())
}
