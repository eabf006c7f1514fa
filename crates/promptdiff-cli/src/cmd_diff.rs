use anyhow::{Context, Result, bail};
use clap::{ArgGroup, Args};
use promptdiff::{
    DiffOutcome, DiffViewer, PathResolver, PromptSummary, SessionDiff, open_diff, render_unified,
};

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("target").required(true).args(["session", "last"])))]
pub struct DiffArgs {
    /// Session id
    #[arg(long, requires = "prompt")]
    session: Option<String>,

    /// Prompt number within the session, as shown by `list`
    #[arg(long, requires = "session")]
    prompt: Option<usize>,

    /// Most recent prompt with edits in this project directory
    #[arg(long, value_name = "PROJECT")]
    last: Option<String>,

    /// Print a unified diff instead of opening a viewer
    #[arg(long)]
    print: bool,

    /// Viewer command (default: $PROMPTDIFF_VIEWER, then pycharm, meld)
    #[arg(long, value_name = "COMMAND")]
    viewer: Option<String>,
}

pub fn run(resolver: &PathResolver, args: DiffArgs) -> Result<()> {
    let manager = SessionDiff::with_resolver(resolver.clone());

    let (session_id, prompt_index, result) = match (&args.last, &args.session, args.prompt) {
        (Some(project), _, _) => {
            let summary = latest(&manager, project)?;
            let result = manager
                .reconstruct_summary(&summary)
                .context("failed to reconstruct prompt")?;
            (summary.session_id, summary.prompt_index, result)
        }
        (None, Some(session_id), Some(index)) => {
            let result = manager
                .reconstruct(session_id, index)
                .with_context(|| format!("failed to reconstruct prompt {index}"))?;
            (session_id.clone(), index, result)
        }
        _ => bail!("either --last or --session with --prompt is required"),
    };

    if result.is_empty() {
        println!("Nothing to show: prompt {prompt_index} of session {session_id} edited no files.");
        return Ok(());
    }

    if args.print {
        print!("{}", render_unified(&result));
        return Ok(());
    }

    let viewer = DiffViewer::resolve(args.viewer.as_deref())?;
    match open_diff(&result, &viewer).context("failed to open diff viewer")? {
        DiffOutcome::Opened(trees) => {
            println!(
                "Opened {} file(s) in {}",
                result.paths().len(),
                viewer.program.display()
            );
            println!("  before: {}", trees.before_dir.display());
            println!("  after:  {}", trees.after_dir.display());
        }
        DiffOutcome::NothingToShow => println!("Nothing to show."),
    }
    Ok(())
}

fn latest(manager: &SessionDiff, project: &str) -> Result<PromptSummary> {
    match manager
        .latest_for_project(project)
        .context("failed to scan session logs")?
    {
        Some(summary) => Ok(summary),
        None => bail!("No prompt with edits found for project {project}"),
    }
}
