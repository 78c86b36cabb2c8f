fn main() -> anyhow::Result<()> {
    doohickey_cli::main()
}
