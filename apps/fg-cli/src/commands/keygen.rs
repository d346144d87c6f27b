// keygen.rs: `fleetgate keygen`.

use fg_capability::SigningKey;

pub fn execute() -> anyhow::Result<()> {
    println!("{}", SigningKey::generate().to_base64());
    Ok(())
}
