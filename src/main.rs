fn main() -> anyhow::Result<()> {
    vrising_manager_lib::run()
}
