//! 菜单目录：饮品与可选配料（尺寸、奶、糖浆、甜味剂、顶料）
//!
//! 只读数据，仅用于拼 system prompt。内置一份默认菜单，也可从 TOML 文件加载（[catalog].path）。

use std::path::Path;

use serde::{Deserialize, Serialize};

/// 饮品及其可定制项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Drink {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub supports_milk: bool,
    #[serde(default)]
    pub supports_sweeteners: bool,
    #[serde(default)]
    pub supports_syrup: bool,
    #[serde(default)]
    pub supports_toppings: bool,
    #[serde(default)]
    pub supports_size: bool,
}

/// 通用选项（尺寸 / 奶 / 糖浆 / 甜味剂 / 顶料）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuOption {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub drinks: Vec<Drink>,
    #[serde(default)]
    pub sizes: Vec<MenuOption>,
    #[serde(default)]
    pub milks: Vec<MenuOption>,
    #[serde(default)]
    pub syrups: Vec<MenuOption>,
    #[serde(default)]
    pub sweeteners: Vec<MenuOption>,
    #[serde(default)]
    pub toppings: Vec<MenuOption>,
}

fn drink(name: &str, description: &str, flags: [bool; 5]) -> Drink {
    let [milk, sweeteners, syrup, toppings, size] = flags;
    Drink {
        name: name.to_string(),
        description: description.to_string(),
        supports_milk: milk,
        supports_sweeteners: sweeteners,
        supports_syrup: syrup,
        supports_toppings: toppings,
        supports_size: size,
    }
}

fn options(items: &[(&str, &str)]) -> Vec<MenuOption> {
    items
        .iter()
        .map(|(name, description)| MenuOption {
            name: name.to_string(),
            description: description.to_string(),
        })
        .collect()
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            drinks: vec![
                drink("Espresso", "A concentrated shot of coffee", [false, true, false, false, false]),
                drink("Americano", "Espresso topped with hot water", [true, true, true, false, true]),
                drink("Latte", "Espresso with steamed milk and a light layer of foam", [true, true, true, true, true]),
                drink("Cappuccino", "Espresso with equal parts steamed milk and foam", [true, true, true, true, true]),
                drink("Mocha", "Espresso with chocolate and steamed milk", [true, true, true, true, true]),
                drink("Flat White", "Espresso with velvety microfoam", [true, true, false, false, true]),
                drink("Macchiato", "Espresso marked with a dollop of foam", [true, true, true, false, false]),
                drink("Hot Chocolate", "Rich chocolate with steamed milk", [true, true, true, true, true]),
                drink("Chai Latte", "Spiced black tea with steamed milk", [true, true, true, true, true]),
                drink("Iced Coffee", "Chilled brewed coffee served over ice", [true, true, true, false, true]),
            ],
            sizes: options(&[
                ("Small", "8 oz"),
                ("Medium", "12 oz"),
                ("Large", "16 oz"),
            ]),
            milks: options(&[
                ("Whole", "Whole dairy milk"),
                ("Skim", "Fat-free dairy milk"),
                ("Oat", "Creamy oat milk"),
                ("Almond", "Unsweetened almond milk"),
                ("Soy", "Soy milk"),
                ("Lactose-free", "Lactose-free dairy milk"),
            ]),
            syrups: options(&[
                ("Vanilla", "Classic vanilla syrup"),
                ("Caramel", "Buttery caramel syrup"),
                ("Hazelnut", "Roasted hazelnut syrup"),
                ("Sugar-free Vanilla", "Vanilla syrup without sugar"),
            ]),
            sweeteners: options(&[
                ("Sugar", "White cane sugar"),
                ("Brown sugar", "Raw brown sugar"),
                ("Honey", "Natural honey"),
                ("Stevia", "Zero-calorie sweetener"),
            ]),
            toppings: options(&[
                ("Whipped cream", "Light whipped cream"),
                ("Cinnamon", "A dusting of cinnamon"),
                ("Cocoa powder", "A dusting of cocoa"),
                ("Caramel drizzle", "Caramel sauce on top"),
            ]),
        }
    }
}

impl Catalog {
    /// 从 TOML 文件加载；文件结构与 Catalog 字段一致（[[drinks]]、[[sizes]] ...）
    pub fn from_toml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read catalog {}: {}", path.display(), e))?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> anyhow::Result<Self> {
        let catalog: Catalog = toml::from_str(raw)?;
        if catalog.drinks.is_empty() {
            anyhow::bail!("catalog must list at least one drink");
        }
        Ok(catalog)
    }

    /// 渲染为 prompt 中的菜单段落
    pub fn to_prompt_section(&self) -> String {
        let mut s = String::from("## Drinks\n");
        for d in &self.drinks {
            let mut supports = Vec::new();
            if d.supports_size {
                supports.push("size");
            }
            if d.supports_milk {
                supports.push("milk");
            }
            if d.supports_syrup {
                supports.push("syrup");
            }
            if d.supports_sweeteners {
                supports.push("sweeteners");
            }
            if d.supports_toppings {
                supports.push("toppings");
            }
            let supports = if supports.is_empty() {
                "no customizations".to_string()
            } else {
                supports.join(", ")
            };
            s.push_str(&format!("- {}: {} (options: {})\n", d.name, d.description, supports));
        }
        for (title, items) in [
            ("Sizes", &self.sizes),
            ("Milks", &self.milks),
            ("Syrups", &self.syrups),
            ("Sweeteners", &self.sweeteners),
            ("Toppings", &self.toppings),
        ] {
            if items.is_empty() {
                continue;
            }
            s.push_str(&format!("\n## {}\n", title));
            for o in items {
                s.push_str(&format!("- {}: {}\n", o.name, o.description));
            }
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_menu_renders_flags() {
        let catalog = Catalog::default();
        let section = catalog.to_prompt_section();
        assert!(section.contains("- Latte: "));
        assert!(section.contains("- Espresso: A concentrated shot of coffee (options: sweeteners)"));
        assert!(section.contains("## Milks\n- Whole"));
    }

    #[test]
    fn test_from_toml() {
        let raw = r#"
            [[drinks]]
            name = "Cortado"
            description = "Espresso cut with warm milk"
            supports_milk = true

            [[milks]]
            name = "Oat"
            description = "Oat milk"
        "#;
        let catalog = Catalog::from_toml_str(raw).unwrap();
        assert_eq!(catalog.drinks.len(), 1);
        assert!(catalog.drinks[0].supports_milk);
        assert!(!catalog.drinks[0].supports_size);
        assert!(catalog.sizes.is_empty());
        assert!(catalog.to_prompt_section().contains("(options: milk)"));
    }

    #[test]
    fn test_empty_catalog_rejected() {
        assert!(Catalog::from_toml_str("drinks = []").is_err());
    }
}
