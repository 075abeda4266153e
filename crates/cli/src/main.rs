use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use rently_core::constants::{DATA_DIR_ENV, DEFAULT_DATA_DIR, DEFAULT_UPLOAD_ROOT, UPLOAD_ROOT_ENV};
use rently_core::repositories::{YamlListingRepository, YamlUserDirectory};
use rently_core::{
    path_from_env_value, CoreConfig, ImageUpload, Listing, ListingId, ListingManager,
    ListingPayload, UserId,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "rently")]
#[command(about = "Rently listings admin CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the listings of one owner
    List {
        /// Owner user id
        #[arg(long)]
        owner: UserId,
    },
    /// Show one listing
    Show {
        /// Listing id
        id: ListingId,
    },
    /// Create a listing with its image
    Create {
        #[command(flatten)]
        fields: ListingArgs,
        /// Image file to attach
        #[arg(long)]
        image: PathBuf,
    },
    /// Replace every attribute of a listing, and optionally its image
    Update {
        /// Listing id
        id: ListingId,
        #[command(flatten)]
        fields: ListingArgs,
        /// New image file (optional)
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Delete a listing and its images
    Delete {
        /// Listing id
        id: ListingId,
    },
    /// Report mismatches between listing records and stored images
    Audit {
        /// Print findings as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
struct ListingArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    street: String,
    #[arg(long)]
    city: String,
    #[arg(long)]
    postal_code: String,
    #[arg(long)]
    description: String,
    /// Price with two fraction digits, e.g. 49.99
    #[arg(long)]
    price: String,
    #[arg(long)]
    category: String,
    #[arg(long)]
    condition: String,
    /// End date (YYYY-MM-DD)
    #[arg(long)]
    end_date: String,
    /// Owner user id (optional)
    #[arg(long)]
    owner: Option<UserId>,
}

impl From<ListingArgs> for ListingPayload {
    fn from(args: ListingArgs) -> Self {
        ListingPayload {
            name: args.name,
            street: args.street,
            city: args.city,
            postal_code: args.postal_code,
            description: args.description,
            price: args.price,
            category: args.category,
            condition: args.condition,
            end_date: args.end_date,
            owner_id: args.owner,
        }
    }
}

fn read_image(path: &Path) -> anyhow::Result<ImageUpload> {
    let bytes =
        std::fs::read(path).with_context(|| format!("reading image {}", path.display()))?;
    let original_filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(ImageUpload {
        bytes,
        original_filename,
    })
}

fn build_manager(cfg: CoreConfig) -> anyhow::Result<ListingManager> {
    let listings = YamlListingRepository::open(cfg.listings_dir())
        .with_context(|| format!("opening {}", cfg.listings_dir().display()))?;
    let users = YamlUserDirectory::new(cfg.users_file());
    Ok(ListingManager::new(
        Arc::new(cfg),
        Arc::new(listings),
        Arc::new(users),
    ))
}

fn print_listing(manager: &ListingManager, listing: &Listing) {
    let view = manager.view(listing);
    let details = &view.details;
    println!(
        "ID: {}, Name: {}, Price: {}, Category: {}, Condition: {}, City: {}, Ends: {}",
        view.id,
        details.name,
        details.price,
        details.category,
        details.condition,
        details.city,
        details.end_date
    );
    match &view.image_path {
        Some(path) => println!("    Image: {}", path),
        None => println!("    Image: (none)"),
    }
}

fn run(cli: Cli, manager: &ListingManager) -> anyhow::Result<()> {
    match cli.command {
        Some(Commands::List { owner }) => {
            let listings = manager.list_by_owner(owner)?;
            if listings.is_empty() {
                println!("No listings found.");
            } else {
                for listing in &listings {
                    print_listing(manager, listing);
                }
            }
        }
        Some(Commands::Show { id }) => {
            let listing = manager.get(id)?;
            print_listing(manager, &listing);
            println!("    Street: {}, {}", listing.details.street, listing.details.postal_code);
            println!("    Description: {}", listing.details.description);
            if let Some(owner) = listing.owner {
                println!("    Owner: {}", owner);
            }
        }
        Some(Commands::Create { fields, image }) => {
            let upload = read_image(&image)?;
            let listing = manager.create(&fields.into(), &upload)?;
            println!("Created listing with ID: {}", listing.id);
        }
        Some(Commands::Update { id, fields, image }) => {
            let upload = image.as_deref().map(read_image).transpose()?;
            let listing = manager.update(id, &fields.into(), upload.as_ref())?;
            println!("Updated listing with ID: {}", listing.id);
        }
        Some(Commands::Delete { id }) => {
            manager.delete(id)?;
            println!("Deleted listing with ID: {}", id);
        }
        Some(Commands::Audit { json }) => {
            let findings = manager.audit()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&findings)?);
            } else if findings.is_empty() {
                println!("No inconsistencies found.");
            } else {
                for finding in &findings {
                    println!("{}", finding);
                }
            }
        }
        None => {
            println!("Use --help for usage");
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("rently_core=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let cfg = CoreConfig::new(
        path_from_env_value(std::env::var(UPLOAD_ROOT_ENV).ok(), DEFAULT_UPLOAD_ROOT),
        path_from_env_value(std::env::var(DATA_DIR_ENV).ok(), DEFAULT_DATA_DIR),
    )?;
    let manager = build_manager(cfg)?;

    run(cli, &manager)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn manager_in(temp: &TempDir) -> ListingManager {
        let cfg = CoreConfig::new(temp.path().join("uploads"), temp.path().join("data"))
            .expect("CoreConfig::new should succeed");
        build_manager(cfg).expect("build_manager should succeed")
    }

    fn create_args(image: &Path) -> Vec<String> {
        [
            "rently",
            "create",
            "--name",
            "Tavolo",
            "--street",
            "Via Garibaldi 7",
            "--city",
            "Bari",
            "--postal-code",
            "70100",
            "--description",
            "Tavolo in noce",
            "--price",
            "120,00",
            "--category",
            "furniture",
            "--condition",
            "fair",
            "--end-date",
            "2030-03-01",
            "--image",
        ]
        .iter()
        .map(|s| s.to_string())
        .chain(std::iter::once(image.display().to_string()))
        .collect()
    }

    #[test]
    fn test_parse_rejects_zero_id() {
        assert!(Cli::try_parse_from(["rently", "show", "0"]).is_err());
        assert!(Cli::try_parse_from(["rently", "show", "12"]).is_ok());
    }

    #[test]
    fn test_create_update_delete_round() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let manager = manager_in(&temp);
        let image = temp.path().join("tavolo.jpg");
        std::fs::write(&image, b"image bytes").unwrap();

        let cli = Cli::try_parse_from(create_args(&image)).expect("create args parse");
        run(cli, &manager).expect("create should succeed");

        let id = ListingId::new(1).unwrap();
        let created = manager.get(id).unwrap();
        assert!(created.image.as_deref().unwrap().ends_with(".jpg"));
        assert!(temp.path().join("data/listings/1.yaml").is_file());

        let mut update = create_args(&image);
        update[1] = "update".into();
        update.insert(2, "1".into());
        let cli = Cli::try_parse_from(update).expect("update args parse");
        run(cli, &manager).expect("update should succeed");
        assert_ne!(manager.get(id).unwrap().image, created.image);

        let cli = Cli::try_parse_from(["rently", "audit"]).unwrap();
        run(cli, &manager).expect("audit should succeed");
        assert!(manager.audit().unwrap().is_empty());

        let cli = Cli::try_parse_from(["rently", "delete", "1"]).unwrap();
        run(cli, &manager).expect("delete should succeed");
        assert!(!temp.path().join("uploads/annunci/1").exists());
    }

    #[test]
    fn test_show_missing_listing_fails() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let manager = manager_in(&temp);
        let cli = Cli::try_parse_from(["rently", "show", "5"]).unwrap();
        assert!(run(cli, &manager).is_err());
    }
}
