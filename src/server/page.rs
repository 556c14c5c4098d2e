pub const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Questionnaires PRISMES</title>
    <style>
        body { font-family: -apple-system, sans-serif; max-width: 900px; margin: 50px auto; padding: 20px; }
        .upload-box { border: 2px dashed #999; padding: 40px; text-align: center; margin: 20px 0; background: #f9f9f9; }
        .btn { background: #007aff; color: white; border: none; padding: 12px 30px; border-radius: 6px; cursor: pointer; }
        .btn:disabled { background: #ccc; }
        .results { margin: 30px 0; padding: 20px; background: #e8f5e9; border-radius: 8px; display: none; }
        .results a { display: inline-block; margin: 10px; padding: 10px 20px; background: white; text-decoration: none; border-radius: 4px; }
        .history-item { padding: 10px; margin: 5px 0; background: #f5f5f5; border-radius: 4px; }
        .status { margin: 20px 0; }
        .error { color: red; }
    </style>
</head>
<body>
    <h1>Traitement Questionnaires</h1>

    <div class="upload-box">
        <input type="file" id="pdfFile" accept=".pdf">
        <br><br>
        <button class="btn" onclick="uploadPDF()">Traiter le PDF</button>
    </div>

    <div class="status" id="status"></div>
    <div class="results" id="results"></div>

    <div style="margin-top:40px">
        <h3>Historique</h3>
        <div id="historyList"></div>
    </div>

    <script>
        async function uploadPDF() {
            const fileInput = document.getElementById('pdfFile');
            const file = fileInput.files[0];
            if (!file) { alert('Sélectionnez un PDF'); return; }

            const status = document.getElementById('status');
            const button = document.querySelector('.btn');

            status.innerHTML = 'Traitement en cours...';
            button.disabled = true;

            const formData = new FormData();
            formData.append('pdf', file);

            try {
                const response = await fetch('upload', { method: 'POST', body: formData });
                const data = await response.json();

                if (data.success) {
                    status.innerHTML = 'Terminé';
                    document.getElementById('results').innerHTML =
                        '<h3>Résultats</h3>' +
                        '<a href="download/' + data.json + '">JSON</a>' +
                        '<a href="download/' + data.excel + '">Excel</a>';
                    document.getElementById('results').style.display = 'block';
                    loadHistory();
                } else {
                    status.innerHTML = '<span class="error">' + data.error + '</span>';
                }
            } catch (error) {
                status.innerHTML = '<span class="error">Erreur: ' + error + '</span>';
            }
            button.disabled = false;
        }

        async function loadHistory() {
            const response = await fetch('history');
            const history = await response.json();
            const list = document.getElementById('historyList');

            list.innerHTML = history.slice(-5).reverse().map(item =>
                '<div class="history-item">' +
                '<strong>' + item.filename + '</strong> - ' + new Date(item.date).toLocaleString('fr-FR') +
                '<br><a href="download/' + item.json + '">JSON</a> | ' +
                '<a href="download/' + item.excel.replace('.xlsx', '.bin') + '">Excel</a></div>'
            ).join('');
        }
        loadHistory();
    </script>
</body>
</html>
"#;
