use mailbucket::{
  app::{self, Mode, config::Config},
  db,
  models::account::Role,
};

const USAGE: &str = "Usage: mailbucket [server|sync|add-user <email> [role]|--version]";

#[tokio::main]
async fn main() {
  dotenv::dotenv().ok();

  let args: Vec<String> = std::env::args().skip(1).collect();
  let result = match args.first().map(String::as_str) {
    Some("--version" | "-V") => {
      println!("mailbucket {}", env!("CARGO_PKG_VERSION"));
      return;
    }
    Some("--help" | "-h") => {
      eprintln!("{USAGE}");
      return;
    }
    None | Some("server") => app::run(Mode::Server).await,
    Some("sync") => app::run(Mode::Sync).await,
    Some("add-user") => add_user(&args[1..]).await,
    Some(other) => {
      eprintln!("unknown command: {other}\n{USAGE}");
      std::process::exit(2);
    }
  };

  if let Err(e) = result {
    eprintln!("error: {e}");
    std::process::exit(1);
  }
}

async fn add_user(args: &[String]) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
  let Some(email) = args.first().filter(|e| e.contains('@')) else {
    return Err(format!("add-user needs an email address\n{USAGE}").into());
  };
  let role = match args.get(1) {
    Some(role) => role.parse::<Role>()?,
    None => Role::User,
  };

  let config = Config::from_env();
  let pool = db::connect(&config.database).await?;
  let id = db::accounts::create(&pool, email, role).await?;
  println!("added {email} as {role:?} (id {id})");
  Ok(())
}
