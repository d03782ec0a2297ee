use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

#[derive(Parser, Debug)]
#[command(name = "feature-registry")]
#[command(about = "Role-gated approval workflow for feature metadata")]
#[command(long_about = "Tracks named, versioned feature definitions through \
                       draft, testing, approval and deployment. Every command acts as a role \
                       (developer, tester, approver) and prints the resulting record as JSON.")]
pub struct Cli {
    /// Configuration file (defaults to ./feature-registry.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the metadata file location
    #[arg(long, global = true)]
    pub metadata_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Register a new feature in DRAFT status
    Create {
        #[arg(long)]
        role: String,
        /// Feature name in category:name:version form
        #[arg(long)]
        name: String,
        #[arg(long, help = "batch, real-time or compute-first")]
        feature_type: String,
        #[arg(long, help = "string, float, integer, boolean, double, bigint, int or decimal")]
        data_type: String,
        #[arg(long)]
        query: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        created_by: String,
    },
    /// Show one feature
    Get {
        #[arg(long)]
        name: String,
        #[arg(long)]
        role: Option<String>,
    },
    /// List features, optionally filtered (falls back to fuzzy matching)
    List {
        #[arg(long)]
        role: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        feature_type: Option<String>,
        #[arg(long)]
        data_type: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        created_by: Option<String>,
        #[arg(long)]
        last_updated_by: Option<String>,
    },
    /// Change feature fields; the feature returns to DRAFT
    Update {
        #[arg(long)]
        role: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        updated_by: String,
        #[arg(long)]
        feature_type: Option<String>,
        #[arg(long)]
        data_type: Option<String>,
        #[arg(long)]
        query: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Soft-delete a feature
    Delete {
        #[arg(long)]
        role: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        deleted_by: String,
        #[arg(long)]
        reason: String,
    },
    /// Move a DRAFT feature to READY_FOR_TESTING
    Submit {
        #[arg(long)]
        role: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        submitted_by: String,
    },
    /// Record a test outcome (TEST_SUCCEEDED or TEST_FAILED)
    Test {
        #[arg(long)]
        role: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        result: String,
        #[arg(long)]
        tested_by: String,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Approve and deploy a tested feature
    Approve {
        #[arg(long)]
        role: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        approved_by: String,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Reject a tested feature
    Reject {
        #[arg(long)]
        role: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        rejected_by: String,
        #[arg(long)]
        reason: String,
    },
    /// Send a feature under test or rejected back to DRAFT
    Fix {
        #[arg(long)]
        role: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        updated_by: String,
    },
    /// Deploy a feature already in APPROVED status
    Deploy {
        #[arg(long)]
        role: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        deployed_by: String,
    },
}
