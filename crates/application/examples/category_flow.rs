use application::CategoryApp;
use domain::ListQuery;
use serde_json::json;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🌳 Category tree walkthrough (in-memory store)");

    let app = CategoryApp::in_memory();
    let categories = &app.categories;

    let electronics = categories
        .create(&json!({
            "name": "electronics",
            "parentId": null,
            "description": "Devices, gadgets and accessories",
            "status": "active"
        }))
        .await?;
    println!("📁 Created root: {} ({})", electronics.name, electronics.id);

    let laptops = categories
        .create(&json!({
            "name": "  laptops  ",
            "parentId": electronics.id.to_string(),
            "description": "Portable computers of every size",
            "status": "active",
            "stockAvailability": true
        }))
        .await?;
    println!("📄 Created child: {} under {}", laptops.name, electronics.name);

    let appliances = categories
        .create(&json!({
            "name": "home   appliances",
            "parentId": null,
            "description": "Large and small household machines",
            "status": "inactive"
        }))
        .await?;
    println!("📁 Created root: {}", appliances.name);

    // Move laptops from electronics to appliances and back again.
    categories
        .update(
            &laptops.id.to_string(),
            &json!({ "parentId": appliances.id.to_string() }),
        )
        .await?;
    println!("🔀 Moved {} under {}", laptops.name, appliances.name);

    categories
        .update(
            &laptops.id.to_string(),
            &json!({ "parentId": electronics.id.to_string() }),
        )
        .await?;
    println!("🔀 Moved {} back under {}", laptops.name, electronics.name);

    match categories.delete(&electronics.id.to_string()).await {
        Ok(_) => println!("⚠️  Unexpectedly deleted a parent"),
        Err(e) => println!("⛔ Delete refused: {}", e),
    }

    println!();
    println!("📊 Current forest:");
    for root in categories.get_all(&ListQuery::default()).await? {
        println!("   • {}", root.category.name);
        for child in root.child_nodes() {
            println!("     └─ {}", child.category.name);
        }
    }

    println!();
    println!("🔎 Search for 'LAP':");
    for hit in categories.search("LAP").await? {
        println!("   • {}", hit.category.name);
    }

    println!();
    println!("🏁 Demo complete!");
    Ok(())
}
