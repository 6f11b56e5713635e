use anyhow::Result;
use cloudpos_client::roles::Role;

#[tokio::main]
async fn main() -> Result<()> {
    let pos = cloudpos_demos::init()?;
    cloudpos_demos::sign_in(&pos).await?;

    let role = pos.auth().session().snapshot().role.unwrap_or_default();
    let areas = pos.permissions(role).areas();
    println!("Áreas habilitadas para {}: {:?}", role, areas);

    if role == Role::Administrador {
        println!("Acceso completo.");
    }

    pos.auth().logout();
    println!("Sesión cerrada");
    Ok(())
}
