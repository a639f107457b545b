fn main() -> anyhow::Result<()> {
    zeroundub::cli::run_cli()
}
