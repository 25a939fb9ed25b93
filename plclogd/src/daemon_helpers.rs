fn binary_dir() -> anyhow::Result<PathBuf> {
    let exe = std::env::current_exe().context("failed to locate running binary")?;
    exe.parent()
        .map(Path::to_path_buf)
        .context("running binary has no parent directory")
}

fn expand_with_home(value: &str, home: Option<&Path>) -> PathBuf {
    let Some(home) = home else {
        return PathBuf::from(value);
    };
    if value == "~" {
        return home.to_path_buf();
    }
    if let Some(rest) = value.strip_prefix("~/") {
        return home.join(rest);
    }
    PathBuf::from(value)
}

fn read_u64<F>(lookup: &F, name: &str, default: u64) -> u64
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

fn read_bool<F>(lookup: &F, name: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|value| {
            matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        })
        .unwrap_or(default)
}

fn tick_mode_label(mode: TickMode) -> &'static str {
    match mode {
        TickMode::Sequential => "sequential",
        TickMode::Overlapping => "overlapping",
    }
}

// tokio's stdin keeps a blocking read alive past shutdown, so Enter is read on a plain thread.
fn spawn_enter_listener() -> oneshot::Receiver<()> {
    let (tx, rx) = oneshot::channel();
    std::thread::spawn(move || {
        let mut line = String::new();
        let _ = std::io::stdin().read_line(&mut line);
        let _ = tx.send(());
    });
    rx
}

async fn wait_for_exit(enter: oneshot::Receiver<()>) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            eprintln!("[plclogd] warning: failed to listen for Ctrl-C: {err}");
            std::future::pending::<()>().await;
        }
    };
    tokio::select! {
        _ = ctrl_c => eprintln!("[plclogd] interrupted"),
        _ = enter => eprintln!("[plclogd] exit requested"),
    }
}
