//! Catalog of the Docusaurus components the enhancer knows how to use.

use serde::Serialize;

/// One entry of the component catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DocumentationComponent {
    pub name: &'static str,
    pub description: &'static str,
    pub usage: &'static str,
    pub example: &'static str,
}

static CATALOG: [DocumentationComponent; 10] = [
    DocumentationComponent {
        name: "Admonition - Note",
        description: "Highlight important information",
        usage: ":::note\nYour content here\n:::",
        example: ":::note\nThis is important information to remember.\n:::",
    },
    DocumentationComponent {
        name: "Admonition - Tip",
        description: "Provide helpful tips",
        usage: ":::tip\nYour tip here\n:::",
        example: ":::tip\nHere's a helpful tip for better performance.\n:::",
    },
    DocumentationComponent {
        name: "Admonition - Warning",
        description: "Warn about potential issues",
        usage: ":::warning\nYour warning here\n:::",
        example: ":::warning\nBe careful when using this feature.\n:::",
    },
    DocumentationComponent {
        name: "Admonition - Caution",
        description: "Indicate caution needed",
        usage: ":::caution\nYour caution here\n:::",
        example: ":::caution\nThis action cannot be undone.\n:::",
    },
    DocumentationComponent {
        name: "Admonition - Danger",
        description: "Highlight dangerous actions",
        usage: ":::danger\nYour danger warning here\n:::",
        example: ":::danger\nThis will delete all your data permanently.\n:::",
    },
    DocumentationComponent {
        name: "Tabs",
        description: "Create tabbed content for multiple options",
        usage: "<Tabs>\n<TabItem value=\"tab1\" label=\"Tab 1\">\nContent 1\n</TabItem>\n<TabItem value=\"tab2\" label=\"Tab 2\">\nContent 2\n</TabItem>\n</Tabs>",
        example: "<Tabs>\n<TabItem value=\"npm\" label=\"npm\">\n```bash\nnpm install package\n```\n</TabItem>\n<TabItem value=\"yarn\" label=\"Yarn\">\n```bash\nyarn add package\n```\n</TabItem>\n</Tabs>",
    },
    DocumentationComponent {
        name: "Details",
        description: "Collapsible content sections",
        usage: "<details>\n<summary>Click to expand</summary>\nHidden content here\n</details>",
        example: "<details>\n<summary>Advanced Configuration</summary>\n\nThis section contains advanced configuration options that most users won't need.\n\n</details>",
    },
    DocumentationComponent {
        name: "Code Block with Title",
        description: "Code blocks with titles and syntax highlighting",
        usage: "```language title=\"filename.ext\"\ncode here\n```",
        example: "```javascript title=\"config.js\"\nmodule.exports = {\n  presets: ['@docusaurus/preset-classic']\n};\n```",
    },
    DocumentationComponent {
        name: "Highlighted Lines",
        description: "Highlight specific lines in code blocks",
        usage: "```language {1,3-5}\ncode here\n```",
        example: "```javascript {2,4-6}\nfunction hello() {\n  console.log('Hello'); // highlighted\n  const name = 'World';\n  if (name) { // highlighted\n    console.log(name); // highlighted\n  } // highlighted\n}\n```",
    },
    DocumentationComponent {
        name: "Frontmatter",
        description: "Document metadata at the top of MDX files",
        usage: "---\ntitle: Page Title\ndescription: Page description\n---",
        example: "---\ntitle: Getting Started\ndescription: Learn how to get started with our platform\nsidebar_position: 1\n---",
    },
];

/// The full catalog, in display order.
pub fn catalog() -> &'static [DocumentationComponent] {
    &CATALOG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_starts_with_admonitions_and_ends_with_frontmatter() {
        let names: Vec<&str> = catalog().iter().map(|c| c.name).collect();
        assert_eq!(names.len(), 10);
        assert_eq!(names[0], "Admonition - Note");
        assert_eq!(names[4], "Admonition - Danger");
        assert_eq!(names[9], "Frontmatter");
        assert!(catalog().iter().all(|c| !c.usage.is_empty()));
    }
}
