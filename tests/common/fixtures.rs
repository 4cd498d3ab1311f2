//! Sample documents, one per notation.

pub const JSON: &str = r#"{"a":1,"b":[true,null,"x"]}"#;

pub const XML: &str = "<a x=\"1\"><b>one</b><c><d/></c><p>mixed <i>text</i> here</p></a>";

pub const HTML: &str = "<!DOCTYPE html><html><head></head><body><div id=\"a\"><p>one <em>two</em></p><pre>  keep\n  this</pre><br><input disabled=\"\"></div></body></html>";

pub const YAML: &str = "title: \"quoted: text\"\nitems:\n- 1\n- two\n- null\nnested:\n  deep:\n    x: 1.5\n";

pub const YAML_STREAM: &str = "---\nname: first\ncount: 1\n---\nname: second\ntags:\n- a\n- b\n";

pub const TOML: &str = "title = \"demo\"\nwhen = 1979-05-27T07:32:00Z\n\n[owner]\nname = \"Tom\"\nids = [1, 2, 3]\n";

pub const INI: &str = "name = demo\n\n[server]\nhost = example.org\nport = 8080\n";

pub const PROPERTIES: &str = "a.b=1\na.c=two words\nx\\=y=leading\nz=line\\nbreak\n";

pub const CSV: &str = "name,qty\napple,3\n\"pear, green\",5\n";

pub const CSS: &str = "h1, h2 {\n  color: red;\n  margin: 0 auto;\n}\n\n@media print {\n  p {\n    display: none;\n  }\n}\n";

pub const JSX: &str = "<ul className=\"list\">\n  <li key={1}>One &lt;1&gt;</li>\n  <li {...rest} />\n  {items.map(i => <li>{i}</li>)}\n</ul>\n";

pub const LATEX: &str = "\\section*{Intro}\nCost is 5\\% of \\$10 \\& more.\\\\[2pt]\nInline $a^2 + b^2$ and \\[E = mc^2\\]\n\\begin{tabular}{ll}\nx & y\n\\end{tabular}\n";

pub const MARKDOWN: &str = "# H\n\npara with **bold** and *em*.\n\n- a\n- b\n";

pub const DOT: &str = "digraph deps {\n  app -> core;\n  core -> value [label=uses];\n}\n";

pub const MERMAID: &str = "flowchart LR\n  a[Start] --> b{Check}\n  b -->|yes| c((Done))\n";

pub const MATH_LATEX: &str = "\\frac{1}{2} - \\sqrt[3]{x}";

pub const MATH_ASCII: &str = "a^(b+c) / 2";
